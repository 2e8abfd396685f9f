//! Structured log macros.
//!
//! Assembly events carry the same field names everywhere so log pipelines
//! can filter on `block_height`.

/// Log a block-related event with standard fields.
///
/// ```rust,ignore
/// log_assembly_event!(info, "[fire] Block emitted", block.height, transactions = 12);
/// ```
#[macro_export]
macro_rules! log_assembly_event {
    ($level:ident, $msg:expr, $block_height:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "block-assembler",
            block_height = $block_height,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a reader lifecycle event (startup, shutdown, summary).
#[macro_export]
macro_rules! log_reader_event {
    ($level:ident, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "reader",
            $($($field)*,)?
            $msg
        )
    };
}
