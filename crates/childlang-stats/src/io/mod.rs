pub mod dataset_table;

pub use dataset_table::{load_dataset, load_dataset_with_config, validate_table_path, TableReaderConfig};
