//! The dummy compiler: resolves every column visibility without any
//! cryptographic compression.
//!
//! Committed columns are sent to the verifier in the clear and
//! precomputed columns are baked into the verifying key. Queries are left
//! untouched; the verifier checks them directly. Useful for testing
//! protocols and as the baseline other compilation chains start from.

use tracing::debug;
use wizard_shared_types::FieldExt;

use crate::column::{ColumnId, Visibility};
use crate::compiled::Builder;

pub fn compile<F: FieldExt>(api: &mut Builder<F>) {
    let rewrites: Vec<(ColumnId, Visibility)> = api
        .compiled()
        .columns
        .iter()
        .filter_map(|(id, info)| match info.visibility {
            Visibility::Committed => Some((ColumnId(id), Visibility::ProofMsg)),
            Visibility::Precomputed => Some((ColumnId(id), Visibility::VerifyingKey)),
            _ => None,
        })
        .collect();
    debug!(rewritten = rewrites.len(), "dummy compiler resolving visibilities");
    for (id, visibility) in rewrites {
        api.set_visibility(id, visibility);
    }
}
