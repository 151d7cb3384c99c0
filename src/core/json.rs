use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Encodes `value` minified, or indented with four spaces when `pretty`.
pub fn encode<T: Serialize + ?Sized>(value: &T, pretty: bool) -> serde_json::Result<Vec<u8>> {
    if !pretty {
        return serde_json::to_vec(value);
    }

    let mut buf = Vec::with_capacity(256);
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minified_and_pretty_forms() {
        let value = json!({ "a": [1] });
        assert_eq!(encode(&value, false).unwrap(), br#"{"a":[1]}"#.to_vec());
        assert_eq!(
            String::from_utf8(encode(&value, true).unwrap()).unwrap(),
            "{\n    \"a\": [\n        1\n    ]\n}"
        );
    }
}
