//! nightjar_diagnostics: numbered messages and error collection.
//!
//! A diagnostic pairs a message template (with a stable numeric code) with a
//! source span. Whether a given severity aborts the parse is decided by the
//! reporter in the parser crate: `Error` always aborts, `StrictModeError`
//! aborts only in strict code, warnings never do.

use nightjar_core::text::SourceSpan;
use std::fmt;

/// Diagnostic severity.
///
/// `StrictModeError` is the conditional class: an error when the enclosing
/// script or function is strict, an extra warning otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    StrictModeError,
    ExtraWarning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::StrictModeError => write!(f, "strict error"),
            Severity::ExtraWarning => write!(f, "extra warning"),
        }
    }
}

/// A diagnostic message template with a stable code.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// The numeric code (e.g. 205).
    pub code: u32,
    /// The default severity of this message.
    pub severity: Severity,
    /// Template text; may contain `{0}`, `{1}`, ... placeholders.
    pub message: &'static str,
}

/// A realized diagnostic with location and resolved message text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Where in the source this was reported, if known.
    pub span: Option<SourceSpan>,
    /// Resolved message text.
    pub message_text: String,
    pub code: u32,
    pub severity: Severity,
}

impl Diagnostic {
    /// Create a diagnostic without location info.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            span: None,
            message_text: format_message(message.message, args),
            code: message.code,
            severity: message.severity,
        }
    }

    /// Create a diagnostic at a source span.
    pub fn at(span: SourceSpan, message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            span: Some(span),
            message_text: format_message(message.message, args),
            code: message.code,
            severity: message.severity,
        }
    }

    /// Re-severity a diagnostic, used when the reporter resolves
    /// `StrictModeError` against the current strictness.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = self.span {
            write!(f, "{}: ", span.begin)?;
        }
        write!(f, "{} NJ{}: {}", self.severity, self.code, self.message_text)
    }
}

/// Substitute `{0}`, `{1}`, ... in a message template.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// Diagnostics accumulated during one parse.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn extend(&mut self, other: DiagnosticCollection) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    /// Sort by source position; diagnostics without spans sort first.
    pub fn sort(&mut self) {
        self.diagnostics
            .sort_by_key(|d| d.span.map(|s| s.begin).unwrap_or(0));
    }
}

// ============================================================================
// Message tables
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: Severity::Error, message: $msg }
        };
        ($code:expr, Warning, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: Severity::Warning, message: $msg }
        };
        ($code:expr, StrictModeError, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: Severity::StrictModeError, message: $msg }
        };
        ($code:expr, ExtraWarning, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: Severity::ExtraWarning, message: $msg }
        };
    }

    // ========================================================================
    // Lexer errors (100-199)
    // ========================================================================
    pub const UNTERMINATED_STRING: DiagnosticMessage = diag!(101, Error, "unterminated string literal");
    pub const UNTERMINATED_COMMENT: DiagnosticMessage = diag!(102, Error, "unterminated comment");
    pub const UNTERMINATED_REGEXP: DiagnosticMessage = diag!(103, Error, "unterminated regular expression literal");
    pub const ILLEGAL_CHARACTER: DiagnosticMessage = diag!(104, Error, "illegal character");
    pub const MALFORMED_NUMBER: DiagnosticMessage = diag!(105, Error, "missing digits after '{0}'");
    pub const BAD_ESCAPE: DiagnosticMessage = diag!(106, Error, "malformed escape sequence");
    pub const BAD_REGEXP_FLAG: DiagnosticMessage = diag!(107, Error, "invalid flag '{0}' after regular expression");
    pub const EOL_IN_STRING: DiagnosticMessage = diag!(108, Error, "unterminated string literal");

    // ========================================================================
    // Syntax errors (200-299)
    // ========================================================================
    pub const EXPECTED_TOKEN: DiagnosticMessage = diag!(201, Error, "'{0}' expected");
    pub const UNEXPECTED_TOKEN: DiagnosticMessage = diag!(202, Error, "unexpected token");
    pub const EXPRESSION_EXPECTED: DiagnosticMessage = diag!(203, Error, "expression expected");
    pub const STATEMENT_EXPECTED: DiagnosticMessage = diag!(204, Error, "statement expected");
    pub const IDENTIFIER_EXPECTED: DiagnosticMessage = diag!(205, Error, "identifier expected");
    pub const SEMI_BEFORE_STATEMENT: DiagnosticMessage = diag!(206, Error, "missing ; before statement");
    pub const PAREN_AFTER_COND: DiagnosticMessage = diag!(207, Error, "missing ) after condition");
    pub const COLON_IN_CONDITIONAL: DiagnosticMessage = diag!(208, Error, "missing : in conditional expression");
    pub const NAME_AFTER_DOT: DiagnosticMessage = diag!(209, Error, "missing name after . operator");
    pub const BRACKET_AFTER_ELEMENT: DiagnosticMessage = diag!(210, Error, "missing ] after element list");
    pub const BRACE_AFTER_PROPERTIES: DiagnosticMessage = diag!(211, Error, "missing } after property list");
    pub const COLON_AFTER_PROPERTY_ID: DiagnosticMessage = diag!(212, Error, "missing : after property id");
    pub const LABEL_NOT_FOUND: DiagnosticMessage = diag!(213, Error, "label not found");
    pub const DUPLICATE_LABEL: DiagnosticMessage = diag!(214, Error, "duplicate label '{0}'");
    pub const BAD_CONTINUE: DiagnosticMessage = diag!(215, Error, "continue must be inside loop");
    pub const BAD_BREAK: DiagnosticMessage = diag!(216, Error, "unlabeled break must be inside loop or switch");
    pub const RETURN_OUTSIDE_FUNCTION: DiagnosticMessage = diag!(217, Error, "return not in function");
    pub const YIELD_OUTSIDE_FUNCTION: DiagnosticMessage = diag!(218, Error, "yield not in function");
    pub const TOO_MANY_DEFAULTS: DiagnosticMessage = diag!(219, Error, "more than one switch default");
    pub const CATCH_AFTER_GENERAL: DiagnosticMessage = diag!(220, Error, "catch after unconditional catch");
    pub const CATCH_OR_FINALLY_EXPECTED: DiagnosticMessage = diag!(221, Error, "missing catch or finally after try");
    pub const CATCH_IDENTIFIER_EXPECTED: DiagnosticMessage = diag!(222, Error, "missing identifier in catch");
    pub const BAD_ASSIGN_TARGET: DiagnosticMessage = diag!(223, Error, "invalid assignment left-hand side");
    pub const BAD_DESTRUCTURING_TARGET: DiagnosticMessage = diag!(224, Error, "invalid destructuring target");
    pub const BAD_INCREMENT_OPERAND: DiagnosticMessage = diag!(225, Error, "invalid {0} operand");
    pub const BAD_FOR_HEAD: DiagnosticMessage = diag!(226, Error, "invalid for/in left-hand side");
    pub const SINGLE_DECL_IN_FOR_IN: DiagnosticMessage = diag!(227, Error, "only one variable declaration allowed in for..in head");
    pub const CONST_WITHOUT_INITIALIZER: DiagnosticMessage = diag!(228, Error, "missing = in const declaration");
    pub const REST_PARAMETER_LAST: DiagnosticMessage = diag!(229, Error, "rest parameter must be last");
    pub const PROPERTY_ID_EXPECTED: DiagnosticMessage = diag!(230, Error, "invalid property id");
    pub const GETTER_NO_PARAMS: DiagnosticMessage = diag!(231, Error, "getter functions must have no arguments");
    pub const SETTER_ONE_PARAM: DiagnosticMessage = diag!(232, Error, "setter functions must have one argument");
    pub const YIELD_AFTER_VALUE_RETURN: DiagnosticMessage = diag!(233, Error, "generator function '{0}' returns a value");
    pub const RETURN_VALUE_IN_GENERATOR: DiagnosticMessage = diag!(234, Error, "generator function '{0}' returns a value");
    pub const FUNCTION_NAME_EXPECTED: DiagnosticMessage = diag!(235, Error, "function statement requires a name");
    pub const UNEXPECTED_END: DiagnosticMessage = diag!(236, Error, "unexpected end of input");
    pub const ARGUMENTS_AND_REST: DiagnosticMessage = diag!(237, Error, "the 'arguments' object may not be used in conjunction with a rest parameter");
    pub const IN_AFTER_FOR_NAME: DiagnosticMessage = diag!(238, Error, "missing 'in' or 'of' after for declaration");
    pub const LINE_BREAK_BEFORE_ARROW: DiagnosticMessage = diag!(239, Error, "no line break is allowed before '=>'");

    // ========================================================================
    // Binding errors & warnings (300-399)
    // ========================================================================
    pub const REDECLARED_VAR: DiagnosticMessage = diag!(301, Error, "redeclaration of {0} '{1}'");
    pub const VAR_HIDES_ARG: DiagnosticMessage = diag!(302, Warning, "variable '{0}' redeclares argument");
    pub const DUPLICATE_FORMAL: DiagnosticMessage = diag!(303, Warning, "duplicate argument '{0}'");
    pub const BAD_DUP_FORMAL: DiagnosticMessage = diag!(304, Error, "duplicate argument '{0}' not allowed in this context");
    pub const UNDECLARED_ASSIGNMENT: DiagnosticMessage = diag!(305, ExtraWarning, "assignment to undeclared variable '{0}'");
    pub const NO_BINDINGS_IN_PATTERN: DiagnosticMessage = diag!(306, ExtraWarning, "destructuring pattern binds no variables");

    // ========================================================================
    // Strict mode (400-499)
    // ========================================================================
    pub const STRICT_WITH: DiagnosticMessage = diag!(401, Error, "strict mode code may not contain 'with' statements");
    pub const STRICT_DELETE_NAME: DiagnosticMessage = diag!(402, StrictModeError, "applying the 'delete' operator to an unqualified name is deprecated");
    pub const STRICT_BAD_BINDING: DiagnosticMessage = diag!(403, StrictModeError, "'{0}' may not be used as an identifier in strict mode");
    pub const STRICT_DUPLICATE_PROPERTY: DiagnosticMessage = diag!(404, StrictModeError, "property name '{0}' appears more than once in object literal");
    pub const ACCESSOR_AFTER_DATA: DiagnosticMessage = diag!(405, Error, "property '{0}' appears as both accessor and data property");
    pub const STRICT_ASSIGN: DiagnosticMessage = diag!(406, StrictModeError, "assignment to '{0}' is restricted in strict mode");
    pub const DUPLICATE_ACCESSOR: DiagnosticMessage = diag!(407, Error, "property '{0}' has a duplicate accessor");

    // ========================================================================
    // Directives (500-549)
    // ========================================================================
    pub const USE_ASM_DIRECTIVE_FAIL: DiagnosticMessage = diag!(501, Warning, "\"use asm\" is only meaningful in the directive prologue of function definitions");

    // ========================================================================
    // Resource limits (550-599)
    // ========================================================================
    pub const TOO_DEEPLY_NESTED: DiagnosticMessage = diag!(551, Error, "too much recursion: program too deeply nested");
    pub const TOO_MANY_BLOCKS: DiagnosticMessage = diag!(552, Error, "program too large: too many block scopes");
    pub const TOO_MANY_BINDINGS: DiagnosticMessage = diag!(553, Error, "program too large: too many bindings");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_substitutes_args() {
        assert_eq!(format_message("'{0}' expected", &["}"]), "'}' expected");
        assert_eq!(
            format_message("redeclaration of {0} '{1}'", &["const", "x"]),
            "redeclaration of const 'x'"
        );
    }

    #[test]
    fn collection_counts_errors() {
        let mut coll = DiagnosticCollection::new();
        coll.add(Diagnostic::new(&messages::UNEXPECTED_TOKEN, &[]));
        coll.add(Diagnostic::new(&messages::VAR_HIDES_ARG, &["x"]));
        assert_eq!(coll.len(), 2);
        assert_eq!(coll.error_count(), 1);
        assert!(coll.has_errors());
    }

    #[test]
    fn sort_orders_by_position() {
        use nightjar_core::text::SourceSpan;
        let mut coll = DiagnosticCollection::new();
        coll.add(Diagnostic::at(SourceSpan::new(9, 10), &messages::UNEXPECTED_TOKEN, &[]));
        coll.add(Diagnostic::at(SourceSpan::new(2, 3), &messages::UNEXPECTED_TOKEN, &[]));
        coll.sort();
        assert_eq!(coll.diagnostics()[0].span.unwrap().begin, 2);
    }
}
