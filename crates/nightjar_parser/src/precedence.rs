//! Binary operator precedence.
//!
//! Ten left-associative precedence classes, logical-or binding loosest and
//! multiplicative tightest. The shift-reduce loop in the parser reduces
//! while the stack top's precedence is greater than or *equal to* the
//! incoming operator's, which is exactly what makes every class
//! left-associative.

use nightjar_ast::kind::BinaryOp;
use nightjar_lexer::TokenKind;

/// Number of binary precedence classes; bounds the shift-reduce stack.
pub const PRECEDENCE_CLASSES: usize = 10;

/// Precedence of a binary operator, 1 (loosest) through 10 (tightest).
pub fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::BitOr => 3,
        BinaryOp::BitXor => 4,
        BinaryOp::BitAnd => 5,
        BinaryOp::StrictEq | BinaryOp::Eq | BinaryOp::StrictNe | BinaryOp::Ne => 6,
        BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::InstanceOf
        | BinaryOp::In => 7,
        BinaryOp::Lsh | BinaryOp::Rsh | BinaryOp::Ursh => 8,
        BinaryOp::Add | BinaryOp::Sub => 9,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 10,
    }
}

/// Map a token to its binary operator, if it is one in this context.
/// `in_allowed` is false while parsing a for-loop initializer, where `in`
/// must not be taken as a relational operator.
pub fn binary_op_for_token(kind: TokenKind, in_allowed: bool) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Or => BinaryOp::Or,
        TokenKind::And => BinaryOp::And,
        TokenKind::BitOr => BinaryOp::BitOr,
        TokenKind::BitXor => BinaryOp::BitXor,
        TokenKind::BitAnd => BinaryOp::BitAnd,
        TokenKind::StrictEq => BinaryOp::StrictEq,
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::StrictNe => BinaryOp::StrictNe,
        TokenKind::Ne => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::InstanceOf => BinaryOp::InstanceOf,
        TokenKind::In if in_allowed => BinaryOp::In,
        TokenKind::Lsh => BinaryOp::Lsh,
        TokenKind::Rsh => BinaryOp::Rsh,
        TokenKind::Ursh => BinaryOp::Ursh,
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        TokenKind::Mul => BinaryOp::Mul,
        TokenKind::Div => BinaryOp::Div,
        TokenKind::Mod => BinaryOp::Mod,
        _ => return None,
    })
}
