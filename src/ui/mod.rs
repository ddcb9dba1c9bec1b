// UI and formatting module

pub mod formatters;

// Re-export commonly used items for cleaner imports
pub use formatters::{
    colorize_status, format_event, format_percent, format_process_row, format_rate,
    format_server, format_size, format_timestamp, process_header,
};
