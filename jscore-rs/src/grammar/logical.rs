//! The "is defined" dialect.
//!
//! Identifiers evaluate to whether the scope chain defines them; adjacent
//! operands without an operator between them are joined with `&&`.

use super::{DataGetter, Language, OperatorRule as R, Visitor};
use crate::exec::{operators as op, unary};

pub(super) fn build() -> Language {
    Language::builder("logical")
        .data_getter(DataGetter::Defined)
        .default_operator("&&")
        .operator("||", R::new(0).multi().lazy(), Visitor::Lazy(op::or))
        .operator("&&", R::new(1).multi().lazy(), Visitor::Lazy(op::and))
        .prefix("!", unary::not)
        .build()
}
