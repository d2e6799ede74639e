//! Shared emission helpers.

/// Banner on every generated file.
pub const FILE_TIP: &str = "// This file is auto generated by grpcgen, do not edit!";
pub const LINT_DISABLE: &str = "// tslint:disable";

/// Standard generated-file header.
pub fn header() -> String {
    format!("{FILE_TIP}\n{LINT_DISABLE}\n")
}

/// Two-space indentation per nesting depth.
pub fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Relative import prefix from a module `depth` package levels below the
/// generation root (`0` → `./`, `2` → `../../`).
pub fn import_prefix(depth: usize) -> String {
    if depth == 0 {
        "./".to_string()
    } else {
        "../".repeat(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_prefix_matches_package_depth() {
        assert_eq!(import_prefix(0), "./");
        assert_eq!(import_prefix(1), "../");
        assert_eq!(import_prefix(3), "../../../");
    }
}
