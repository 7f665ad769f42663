#[derive(Debug, thiserror::Error)]
pub enum RudpError {
    #[error("payload of {len} bytes exceeds the configured maximum of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
}
