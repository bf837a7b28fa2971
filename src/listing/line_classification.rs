//! Line Classification
//!
//! Decides what a single line of a `bpftrace -lv` listing is. The listing looks like:
//!
//!     kfunc:vmlinux:dev_set_mtu
//!         struct net_device * dev
//!         int new_mtu
//!         int retval
//!     tracepoint:net:net_dev_xmit
//!         void * skbaddr
//!
//! A kfunc header starts a signature block, indented lines below it are its arguments.
//! Every other line (other probe kinds, blank lines, indented text without a type/name
//! split) is `Neither` and ends the current block for the collector.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Prefix of every kfunc probe header in the listing.
pub const KFUNC_PREFIX: &str = "kfunc:";

/// `kfunc:<module>:<function>` or, on older bpftrace, `kfunc:<function>`.
static HEADER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^kfunc:(?:(?P<module>[^:\s]+):)?(?P<function>[^:\s]+)$")
        .expect("header pattern is valid")
});

/// Coarse category of an argument's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentClass {
    Pointer,
    String,
    Integer,
    Other,
}

impl ArgumentClass {
    /// Classify declared type text.
    ///
    /// Rules are checked in this order and the first match wins:
    /// 1. starts with `char` -> String (so `char *` is a string, not a pointer)
    /// 2. ends with `*` -> Pointer
    /// 3. contains `int` -> Integer
    /// 4. Other
    pub fn from_type_text(type_text: &str) -> Self {
        if type_text.starts_with("char") {
            ArgumentClass::String
        } else if type_text.ends_with('*') {
            ArgumentClass::Pointer
        } else if type_text.contains("int") {
            ArgumentClass::Integer
        } else {
            ArgumentClass::Other
        }
    }
}

/// One argument line of a signature block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub type_text: String,
    pub class: ArgumentClass,
}

/// A kfunc header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHeader {
    /// The trimmed header line, e.g. `kfunc:vmlinux:foo`. Used as the probe in snippets.
    pub probe: String,
    pub module: Option<String>,
    pub function: Option<String>,
}

/// Classification result for a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    FunctionHeader(ProbeHeader),
    ArgumentDeclaration(Argument),
    Neither,
}

/// Determine the kind of a listing line.
///
/// Header detection wins over argument detection; a header never starts with whitespace
/// anyway, so the two can't overlap.
pub fn classify_line(line: &str) -> LineKind {
    if is_function_header(line) {
        return LineKind::FunctionHeader(parse_header(line));
    }

    if is_argument_declaration(line) {
        return LineKind::ArgumentDeclaration(parse_argument(line));
    }

    LineKind::Neither
}

/// Check if the line opens a kfunc signature block.
pub fn is_function_header(line: &str) -> bool {
    line.starts_with(KFUNC_PREFIX)
}

/// Check if the line is indented and holds a `<type> <name>` pair.
pub fn is_argument_declaration(line: &str) -> bool {
    let indented = line.chars().next().is_some_and(char::is_whitespace);
    indented && line.trim().contains(' ')
}

fn parse_header(line: &str) -> ProbeHeader {
    let probe = line.trim().to_string();
    let (module, function) = match HEADER_PATTERN.captures(&probe) {
        Some(caps) => (
            caps.name("module").map(|m| m.as_str().to_string()),
            caps.name("function").map(|m| m.as_str().to_string()),
        ),
        None => (None, None),
    };

    ProbeHeader {
        probe,
        module,
        function,
    }
}

/// Split an argument declaration on its last space.
///
/// Pointer stars written against the name (`struct sk_buff *skb`) are moved onto the
/// type so both spellings produce the type `struct sk_buff *`.
fn parse_argument(line: &str) -> Argument {
    let declaration = line.trim();
    let (type_part, name_part) = declaration
        .rsplit_once(' ')
        .unwrap_or(("", declaration));

    let name = name_part.trim_start_matches('*');
    let stars = &name_part[..name_part.len() - name.len()];

    let (type_text, name) = if stars.is_empty() || name.is_empty() {
        (type_part.trim_end().to_string(), name_part.to_string())
    } else {
        (format!("{} {}", type_part.trim_end(), stars), name.to_string())
    };

    let class = ArgumentClass::from_type_text(&type_text);
    Argument {
        name,
        type_text,
        class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn argument(line: &str) -> Argument {
        match classify_line(line) {
            LineKind::ArgumentDeclaration(arg) => arg,
            other => panic!("expected an argument for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_header() {
        let kind = classify_line("kfunc:vmlinux:dev_set_mtu\n");
        assert_eq!(
            kind,
            LineKind::FunctionHeader(ProbeHeader {
                probe: "kfunc:vmlinux:dev_set_mtu".to_string(),
                module: Some("vmlinux".to_string()),
                function: Some("dev_set_mtu".to_string()),
            })
        );
    }

    #[test]
    fn test_classify_header_without_module() {
        match classify_line("kfunc:tcp_v4_rcv") {
            LineKind::FunctionHeader(header) => {
                assert_eq!(header.probe, "kfunc:tcp_v4_rcv");
                assert_eq!(header.module, None);
                assert_eq!(header.function.as_deref(), Some("tcp_v4_rcv"));
            }
            other => panic!("expected a header, got {other:?}"),
        }
    }

    #[test]
    fn test_glued_pointer_declarator() {
        let arg = argument("    struct sk_buff *skb");
        assert_eq!(arg.type_text, "struct sk_buff *");
        assert_eq!(arg.name, "skb");
        assert_eq!(arg.class, ArgumentClass::Pointer);
    }

    #[test]
    fn test_spaced_pointer_declarator() {
        let arg = argument("    struct sk_buff * skb");
        assert_eq!(arg.type_text, "struct sk_buff *");
        assert_eq!(arg.name, "skb");
    }

    #[test]
    fn test_double_pointer() {
        let arg = argument("    struct sk_buff **pskb");
        assert_eq!(arg.type_text, "struct sk_buff **");
        assert_eq!(arg.name, "pskb");
        assert_eq!(arg.class, ArgumentClass::Pointer);
    }

    #[test]
    fn test_multi_word_type_is_kept() {
        let arg = argument("\tconst unsigned long long size");
        assert_eq!(arg.type_text, "const unsigned long long");
        assert_eq!(arg.name, "size");
    }

    #[rstest]
    #[case("    char *name", ArgumentClass::String)]
    #[case("    char * name", ArgumentClass::String)]
    #[case("    const char * name", ArgumentClass::Pointer)]
    #[case("    struct net_device * dev", ArgumentClass::Pointer)]
    #[case("    unsigned int flags", ArgumentClass::Integer)]
    #[case("    u32 mark", ArgumentClass::Other)]
    #[case("    bool enable", ArgumentClass::Other)]
    fn test_argument_class(#[case] line: &str, #[case] expected: ArgumentClass) {
        assert_eq!(argument(line).class, expected);
    }

    #[rstest]
    #[case("")]
    #[case("    ")]
    #[case("    retval")]
    #[case("tracepoint:net:net_dev_xmit")]
    #[case("kprobe:dev_set_mtu")]
    #[case("struct sk_buff * skb")]
    fn test_neither(#[case] line: &str) {
        assert_eq!(classify_line(line), LineKind::Neither);
    }
}
