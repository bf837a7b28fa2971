//! Property-based tests for listing line classification
//!
//! These check the classifier against generated headers and argument lines rather than
//! a fixed sample of bpftrace output.

use proptest::prelude::*;
use xsnoop::listing::{classify_line, ArgumentClass, LineKind};

fn identifier() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,15}"
}

fn type_words() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z_][a-z0-9_]{0,10}", 1..4).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn header_name_is_trimmed_line(
        module in identifier(),
        function in identifier(),
        trailing in "[ \t]{0,3}",
    ) {
        let line = format!("kfunc:{module}:{function}{trailing}");
        match classify_line(&line) {
            LineKind::FunctionHeader(header) => {
                prop_assert_eq!(header.probe, format!("kfunc:{module}:{function}"));
                prop_assert_eq!(header.module, Some(module));
                prop_assert_eq!(header.function, Some(function));
            }
            other => prop_assert!(false, "expected a header, got {:?}", other),
        }
    }

    #[test]
    fn argument_splits_on_last_space(
        indent in "[ \t]{1,8}",
        type_text in type_words(),
        name in identifier(),
    ) {
        let line = format!("{indent}{type_text} {name}");
        match classify_line(&line) {
            LineKind::ArgumentDeclaration(arg) => {
                prop_assert_eq!(&arg.type_text, &type_text);
                prop_assert_eq!(&arg.name, &name);
                prop_assert_eq!(arg.class, ArgumentClass::from_type_text(&type_text));
            }
            other => prop_assert!(false, "expected an argument, got {:?}", other),
        }
    }

    #[test]
    fn glued_and_spaced_pointers_agree(
        type_text in type_words(),
        name in identifier(),
        depth in 1usize..3,
    ) {
        let stars = "*".repeat(depth);
        let glued = classify_line(&format!("    {type_text} {stars}{name}"));
        let spaced = classify_line(&format!("    {type_text} {stars} {name}"));
        prop_assert_eq!(glued, spaced);
    }

    #[test]
    fn pointer_types_are_pointers_unless_char(type_text in type_words()) {
        let pointer = format!("{type_text} *");
        let expected = if pointer.starts_with("char") {
            ArgumentClass::String
        } else {
            ArgumentClass::Pointer
        };
        prop_assert_eq!(ArgumentClass::from_type_text(&pointer), expected);
    }

    #[test]
    fn unindented_non_header_lines_are_neither(line in "[a-jl-z][a-z:_ ]{0,30}") {
        prop_assert_eq!(classify_line(&line), LineKind::Neither);
    }
}
