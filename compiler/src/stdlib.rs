//! Modules compiled into `adlc` so that schemas can use them without a file
//! on the search path.

pub const SYS_TYPES: &str = "sys.types";

pub const SYS_TYPES_ADL: &str = r#"
/// Generic types shared by every ADL schema.
module sys.types {

struct Pair<T1, T2> {
    T1 v1;
    T2 v2;
};

union Either<T1, T2> {
    T1 left;
    T2 right;
};

union Maybe<T> {
    Void nothing;
    T just;
};

union Error<T> {
    T value;
    String error;
};

struct MapEntry<K, V> {
    @SerializedName "k"
    K key;
    @SerializedName "v"
    V value;
};

newtype Map<K, V> = Vector<Pair<K, V>>;

newtype Set<T> = Vector<T>;

union Result<T, E> {
    T ok;
    E error;
};

};
"#;

/// Source of a built-in module, if `name` is one.
pub fn builtin_source(name: &str) -> Option<&'static str> {
    match name {
        SYS_TYPES => Some(SYS_TYPES_ADL),
        _ => None,
    }
}

/// Built-in newtypes whose values must not repeat a key (`Map`) or an element (`Set`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    Keys,
    Elements,
}

pub fn uniqueness(module: &str, name: &str) -> Option<Uniqueness> {
    match (module, name) {
        (SYS_TYPES, "Map") => Some(Uniqueness::Keys),
        (SYS_TYPES, "Set") => Some(Uniqueness::Elements),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_schema, tokenizer::tokenize_schema};

    #[test]
    fn test_sys_types_parses() {
        let tokens = tokenize_schema(SYS_TYPES, SYS_TYPES_ADL).unwrap();
        let module = parse_schema(SYS_TYPES, &tokens).unwrap();
        assert_eq!(module.name, SYS_TYPES);
        let names: Vec<&str> = module.decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Pair", "Either", "Maybe", "Error", "MapEntry", "Map", "Set", "Result"]
        );
    }
}
