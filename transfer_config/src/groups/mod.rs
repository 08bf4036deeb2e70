pub mod sparse_cache;
