pub mod extraction_cache;
