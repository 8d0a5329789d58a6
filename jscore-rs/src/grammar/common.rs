//! The JavaScript-flavored dialect.
//!
//! Precedence (lowest → highest):
//!   `;`  →  `,`  →  `=>`  →  assignment  →  `? :`  →  `|| ??`  →  `&&`  →
//!   `|`  →  `^`  →  `&`  →  equality  →  relational / `IN`  →  shifts  →
//!   additive  →  multiplicative  →  `**`

use super::{DataGetter, KeywordFeatures as F, KeywordKind as K, Language, OperatorRule as R, Visitor};
use crate::exec::{assign, operators as op, unary};

const UNSUPPORTED: &[&str] = &[
    "class", "try", "catch", "finally", "switch", "case", "default", "yield", "async", "await",
    "import", "export", "with", "extends", "super", "debugger",
];

pub(super) fn build() -> Language {
    use Visitor::{Eager, Lazy};

    let assign_rule = R::new(3).rtl().assignment();

    let mut b = Language::builder("common")
        .separator(";")
        .ternary("?", ":")
        .data_getter(DataGetter::Script)
        .grammar_only(";", R::new(0).multi())
        .operator(",", R::new(1).multi(), Eager(op::comma))
        .grammar_only("=>", R::new(2).rtl())
        // Assignment
        .operator("=", assign_rule.multi(), Lazy(assign::assign))
        .operator("+=", assign_rule, Lazy(assign::add_assign))
        .operator("-=", assign_rule, Lazy(assign::sub_assign))
        .operator("*=", assign_rule, Lazy(assign::mul_assign))
        .operator("/=", assign_rule, Lazy(assign::div_assign))
        .operator("%=", assign_rule, Lazy(assign::rem_assign))
        .operator("**=", assign_rule, Lazy(assign::pow_assign))
        .operator("<<=", assign_rule, Lazy(assign::shl_assign))
        .operator(">>=", assign_rule, Lazy(assign::shr_assign))
        .operator(">>>=", assign_rule, Lazy(assign::ushr_assign))
        .operator("&=", assign_rule, Lazy(assign::bit_and_assign))
        .operator("|=", assign_rule, Lazy(assign::bit_or_assign))
        .operator("^=", assign_rule, Lazy(assign::bit_xor_assign))
        .operator("&&=", assign_rule, Lazy(assign::and_assign))
        .operator("||=", assign_rule, Lazy(assign::or_assign))
        .operator("??=", assign_rule, Lazy(assign::nullish_assign))
        // Conditional
        .operator("?", R::new(4).rtl().lazy(), Lazy(op::ternary))
        .operator(":", R::new(4).rtl().lazy(), Lazy(op::pair_outside_literal))
        // Logical
        .operator("||", R::new(5).multi().lazy(), Lazy(op::or))
        .operator("??", R::new(5).multi().lazy(), Lazy(op::nullish))
        .operator("&&", R::new(6).multi().lazy(), Lazy(op::and))
        // Bitwise
        .operator("|", R::new(7).multi(), Eager(op::bit_or))
        .operator("^", R::new(8).multi(), Eager(op::bit_xor))
        .operator("&", R::new(9).multi(), Eager(op::bit_and))
        // Equality
        .operator("==", R::new(10), Eager(op::eq))
        .operator("!=", R::new(10), Eager(op::ne))
        .operator("===", R::new(10), Eager(op::strict_eq))
        .operator("!==", R::new(10), Eager(op::strict_ne))
        // Relational
        .operator("<", R::new(11), Eager(op::lt))
        .operator(">", R::new(11), Eager(op::gt))
        .operator("<=", R::new(11), Eager(op::le))
        .operator(">=", R::new(11), Eager(op::ge))
        .operator("IN", R::new(11), Eager(op::contains))
        .operator("NOT IN", R::new(11), Eager(op::not_contains))
        .operator("of", R::new(11), Eager(op::of_outside_for))
        .alias("in", "IN")
        .alias("not in", "NOT IN")
        // Shifts
        .operator("<<", R::new(12), Eager(op::shl))
        .operator(">>", R::new(12), Eager(op::shr))
        .operator(">>>", R::new(12), Eager(op::ushr))
        // Arithmetic
        .operator("+", R::new(13).multi(), Eager(op::add))
        .operator("-", R::new(13).multi(), Eager(op::sub))
        .operator("*", R::new(14), Eager(op::mul))
        .operator("/", R::new(14), Eager(op::div))
        .operator("%", R::new(14), Eager(op::rem))
        .operator("**", R::new(15).rtl(), Eager(op::pow))
        // Unary attributes
        .prefix("!", unary::not)
        .prefix("~", unary::bit_not)
        .prefix("+", unary::plus)
        .prefix("-", unary::minus)
        .prefix("++", unary::pre_increment)
        .prefix("--", unary::pre_decrement)
        .postfix("++", unary::post_increment)
        .postfix("--", unary::post_decrement)
        .prefix("...", unary::spread_outside_list)
        // Keywords
        .keyword("if", K::If, F::PARENS.union(F::BODY).union(F::ELSE_CHAIN))
        .keyword("else", K::Else, F::empty())
        .keyword("else if", K::ElseIf, F::empty())
        .keyword("for", K::For, F::PARENS.union(F::BODY))
        .keyword("while", K::While, F::PARENS.union(F::BODY))
        .keyword("do", K::Do, F::BODY.union(F::TRAILING_CONDITION))
        .keyword("return", K::Return, F::ARGUMENT)
        .keyword("break", K::Break, F::NO_ARGUMENT)
        .keyword("continue", K::Continue, F::NO_ARGUMENT)
        .keyword("throw", K::Throw, F::ARGUMENT)
        .keyword("function", K::Function, F::NAME.union(F::PARENS).union(F::BLOCK))
        .keyword("var", K::Declare, F::ARGUMENT)
        .keyword("let", K::Declare, F::ARGUMENT)
        .keyword("const", K::Declare, F::ARGUMENT)
        .keyword("new", K::New, F::empty())
        .keyword("typeof", K::Typeof, F::empty())
        .keyword("delete", K::Delete, F::empty())
        .keyword("void", K::Void, F::empty());

    for word in UNSUPPORTED {
        b = b.keyword(word, K::Unsupported, F::empty());
    }
    b.build()
}
