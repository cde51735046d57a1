use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::ExternalError;
use crate::external::run_process;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Lossless re-compression of encoded thumbnails.
#[async_trait]
pub trait ImageOptimizer: Send + Sync {
    /// Return an equivalent, hopefully smaller, encoding of `png`.
    async fn optimize(&self, png: Bytes) -> Result<Bytes, ExternalError>;
}

/// Leaves images untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOptimizer;

#[async_trait]
impl ImageOptimizer for NoopOptimizer {
    async fn optimize(&self, png: Bytes) -> Result<Bytes, ExternalError> {
        Ok(png)
    }
}

/// Runs `optipng` on a scratch copy of each PNG.
#[derive(Debug, Clone)]
pub struct OptipngOptimizer {
    program: String,
    timeout: Duration,
}

impl OptipngOptimizer {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for OptipngOptimizer {
    fn default() -> Self {
        Self::new("optipng", Duration::from_secs(60))
    }
}

#[async_trait]
impl ImageOptimizer for OptipngOptimizer {
    async fn optimize(&self, png: Bytes) -> Result<Bytes, ExternalError> {
        if !png.starts_with(&PNG_SIGNATURE) {
            return Ok(png);
        }

        let io_error = |e: std::io::Error| ExternalError::Io(e.to_string());
        let dir = tempfile::tempdir().map_err(io_error)?;
        let path = dir.path().join("img.png");
        tokio::fs::write(&path, &png).await.map_err(io_error)?;

        let args = vec!["-quiet".to_string(), path.display().to_string()];
        run_process(&self.program, &args, None, self.timeout).await?;

        let optimized = tokio::fs::read(&path).await.map_err(io_error)?;
        debug!(before = png.len(), after = optimized.len(), "optipng finished");
        if optimized.len() < png.len() && optimized.starts_with(&PNG_SIGNATURE) {
            Ok(Bytes::from(optimized))
        } else {
            Ok(png)
        }
    }
}
