//! Conversions between the dotted source form and the `/`-separated internal
//! form of class names, and substitution of class names inside type
//! descriptor strings.

use std::collections::HashMap;

/// Map of internal-form class names to their replacements, as used by
/// cross-pool copies.
pub type ClassMap = HashMap<String, String>;

/// `com.example.Foo` -> `com/example/Foo`.
pub fn to_jvm_name(name: &str) -> String {
    name.replace('.', "/")
}

/// `com/example/Foo` -> `com.example.Foo`.
pub fn to_java_name(name: &str) -> String {
    name.replace('/', ".")
}

/// Derives the default source file name (`Foo.java`) from a qualified class
/// name in either form.
pub fn source_file_name(qualified: &str) -> String {
    let simple = qualified
        .rsplit(['.', '/'])
        .next()
        .unwrap_or(qualified);
    format!("{simple}.java")
}

/// Replaces `old` with `new` wherever it occurs as an object type
/// (`Lold;`) inside a descriptor or signature string. `<` is accepted as a
/// name terminator as well, so parameterized signature forms
/// (`Lpkg/Foo<...>;`) are renamed too.
///
/// Returns `None` when nothing matched.
pub fn rename(desc: &str, old: &str, new: &str) -> Option<String> {
    substitute(desc, |name| (name == old).then(|| new.to_string()))
}

/// Like [`rename`], but substituting every object type found in `map`.
pub fn rename_with_map(desc: &str, map: &ClassMap) -> Option<String> {
    substitute(desc, |name| map.get(name).cloned())
}

fn substitute(desc: &str, subst: impl Fn(&str) -> Option<String>) -> Option<String> {
    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;
    let mut changed = false;
    while let Some(l) = rest.find('L') {
        let (head, tail) = rest.split_at(l + 1);
        out.push_str(head);
        let Some(end) = tail.find([';', '<']) else {
            out.push_str(tail);
            rest = "";
            break;
        };
        let name = &tail[..end];
        match subst(name) {
            Some(replacement) => {
                out.push_str(&replacement);
                changed = true;
            }
            None => out.push_str(name),
        }
        rest = &tail[end..];
    }
    out.push_str(rest);
    changed.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_forms() {
        assert_eq!(to_jvm_name("java.lang.Object"), "java/lang/Object");
        assert_eq!(to_java_name("java/lang/Object"), "java.lang.Object");
        assert_eq!(source_file_name("com.example.Foo"), "Foo.java");
        assert_eq!(source_file_name("Foo"), "Foo.java");
    }

    #[test]
    fn renames_object_types_only() {
        assert_eq!(
            rename("(Lcom/example/Foo;I)Lcom/example/Foo;", "com/example/Foo", "x/Bar"),
            Some("(Lx/Bar;I)Lx/Bar;".to_string())
        );
        // Whole-string matches without the L...; wrapper are not descriptors.
        assert_eq!(rename("com/example/Foo", "com/example/Foo", "x/Bar"), None);
        // Names that merely share a prefix are left alone.
        assert_eq!(rename("(Lcom/example/FooBar;)V", "com/example/Foo", "x/Bar"), None);
    }

    #[test]
    fn renames_array_and_generic_forms() {
        assert_eq!(
            rename("[[Lcom/example/Foo;", "com/example/Foo", "x/Bar"),
            Some("[[Lx/Bar;".to_string())
        );
        assert_eq!(
            rename(
                "Ljava/util/List<Lcom/example/Foo;>;",
                "com/example/Foo",
                "x/Bar"
            ),
            Some("Ljava/util/List<Lx/Bar;>;".to_string())
        );
        assert_eq!(
            rename("Lcom/example/Foo<TT;>;", "com/example/Foo", "x/Bar"),
            Some("Lx/Bar<TT;>;".to_string())
        );
    }

    #[test]
    fn rename_map_substitutes_every_match() {
        let mut map = ClassMap::new();
        map.insert("a/A".to_string(), "b/B".to_string());
        map.insert("c/C".to_string(), "d/D".to_string());
        assert_eq!(
            rename_with_map("(La/A;Lc/C;)V", &map),
            Some("(Lb/B;Ld/D;)V".to_string())
        );
        assert_eq!(rename_with_map("(Le/E;)V", &map), None);
    }
}
