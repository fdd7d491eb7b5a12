use crate::error::Result;
use crate::scheduler::Placer;

impl Placer {
    /// Keep the finished image intact: rescan forever, repainting any pixel
    /// that drifted. Only returns on a fatal error.
    pub async fn defend(&mut self) -> Result<()> {
        tracing::info!("Entering defend mode");
        loop {
            let restored = self.defend_cycle().await?;
            if restored > 0 {
                tracing::info!("Defend scan restored {} pixels", restored);
            }
            tokio::time::sleep(self.pacing().defend_interval).await;
        }
    }

    /// One raster scan of the target against the cache. Returns how many
    /// placements were accepted.
    pub async fn defend_cycle(&mut self) -> Result<usize> {
        let target = self.target();
        let mut restored = 0;
        for (ix, iy) in target.raster() {
            let Some(color) = target.desired(ix, iy) else {
                continue;
            };
            let (x, y) = self.absolute(ix, iy);
            if self.ensure(x, y, color).await? {
                tracing::info!("[defend] Restored ({}, {})", x, y);
                restored += 1;
            }
        }
        Ok(restored)
    }
}
