#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Stratus infrastructure crates.
//!
//! ## Usage
//! Every crate that declares an error enum depends on this crate and on `thiserror`:
//! ```toml
//! [dependencies]
//! stratus-derive.workspace = true
//! thiserror.workspace = true
//! ```

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` when missing.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context(...)`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `source` field
///   (or a field marked `#[source]`/`#[from]`), enabling `?` on upstream errors.
/// * **Internal Fallback**: Provides `From<&'static str>` and `From<String>` if an
///   `Internal` variant is present.
/// * **Introspection**: Generates `kind()` (the variant name) and `context_str()` accessors,
///   used as structured logging fields.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants only.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants with a source field must also carry a context field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[stratus_derive::stratus_error]
/// pub enum BusError {
///     #[error("Unknown receiver{}: {message}", format_context(.context))]
///     UnknownReceiver { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn lookup() -> Result<(), BusError> {
///     Err("receiver table poisoned".into())
/// }
///
/// let err = lookup().context("dispatching Ping").unwrap_err();
/// assert_eq!(err.kind(), "Internal");
/// assert_eq!(err.context_str(), Some("dispatching Ping"));
/// ```
#[proc_macro_attribute]
pub fn stratus_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand_derive(input).into()
}
