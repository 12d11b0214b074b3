//! `agenda-sharing`: time-bounded, revocable share links over a typed resource scope.

pub mod escopo;
pub mod events;
pub mod share_link;
pub mod token;

pub use escopo::{EscopoCompartilhamento, EscopoSnapshot, Permissao, TipoRecursoCompartilhado};
pub use events::{ShareLinkAcessado, ShareLinkGerado, SharingEvent};
pub use share_link::{ShareLink, ShareLinkProps, ShareLinkSnapshot};
pub use token::TokenShare;
