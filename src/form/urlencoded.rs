// URL-encoded form decoding
//
// Lenient: pairs that fail to decode are skipped instead of failing the request.

use std::borrow::Cow;

use super::Form;

/// Decode `a=1&b=two+words` pairs into `form`, in input order
pub(super) fn parse_into(input: &str, form: &mut Form) {
    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if let (Some(key), Some(value)) = (decode(key), decode(value)) {
            form.push_value(key, value);
        }
    }
}

fn decode(component: &str) -> Option<String> {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let mut form = Form::default();
        parse_into("name=Jane+Doe&tag=a&tag=b%2Fc&empty=&flag", &mut form);
        assert_eq!(form.value("name"), Some("Jane Doe"));
        assert_eq!(form.values("tag"), ["a", "b/c"]);
        assert_eq!(form.value("empty"), Some(""));
        assert_eq!(form.value("flag"), Some(""));
    }

    #[test]
    fn test_invalid_pairs_are_skipped() {
        let mut form = Form::default();
        parse_into("bad=%FF%FE&good=1&&", &mut form);
        assert_eq!(form.value("bad"), None);
        assert_eq!(form.value("good"), Some("1"));
    }

    #[test]
    fn test_value_keeps_later_equals() {
        let mut form = Form::default();
        parse_into("expr=a%3Db=c", &mut form);
        assert_eq!(form.value("expr"), Some("a=b=c"));
    }
}
