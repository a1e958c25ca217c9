//! The osier expression core: the element tree, environments, the layout
//! engine, the spec runtime, and the two-phase resolve/evaluate program.
//!
//! Elements flow through `Prog::resl`, which interleaves type inference and
//! partial evaluation until the unresolved set stops shrinking, and then
//! through `Prog::eval`, which produces literal atoms (or partial calls in
//! partial mode).

mod el;
mod env;
mod error;
pub mod layout;
mod prog;
mod spec;

pub use el::{traverse, Atom, Call, Dyn, El, Named, Sym, Val, VisitRes, Visitor, Walk};
pub use env::{find_def, select_typ, Def, Found, Scope};
pub use error::Error;
pub use osier_lexer::Span;
pub use prog::{Mode, Prog};
pub use spec::{impl_form, is_variadic, FormFn, FormImpl, Spec, SpecImpl};
