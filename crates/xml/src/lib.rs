//! Two independent concerns, kept in separate modules because they use the
//! document at different fidelities: [`decode`] is a tolerant,
//! namespace-stripping reader used for everything ADT returns; [`surgical`]
//! is a byte-preserving text editor used only for message-class documents,
//! which SAP rejects if they are not byte-shape-identical to what it
//! originally emitted.

pub mod decode;
pub mod surgical;

pub use decode::{strip_namespace_prefixes, Element};
pub use surgical::{modify_message_class_xml, MessageClassEdit};
