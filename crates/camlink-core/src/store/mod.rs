// ── In-memory device storage ──

mod collection;

pub(crate) use collection::EntityCollection;
