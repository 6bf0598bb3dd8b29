//! Block render passes.

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

/// The passes chunk geometry is split into, in draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive, Serialize, Deserialize)]
pub enum BlockRenderPass {
    Solid = 0,
    SolidMipped = 1,
    Cutout = 2,
    CutoutMipped = 3,
    Translucent = 4,
}

impl BlockRenderPass {
    /// Number of passes
    pub const COUNT: usize = 5;

    /// All passes in draw order.
    pub const ALL: [BlockRenderPass; 5] = [
        BlockRenderPass::Solid,
        BlockRenderPass::SolidMipped,
        BlockRenderPass::Cutout,
        BlockRenderPass::CutoutMipped,
        BlockRenderPass::Translucent,
    ];

    /// Translucent passes are drawn back-to-front and sorted per quad.
    pub fn is_translucent(self) -> bool {
        self == BlockRenderPass::Translucent
    }

    pub fn from_index(index: usize) -> Option<BlockRenderPass> {
        <BlockRenderPass as num::FromPrimitive>::from_usize(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_translucent_is_translucent() {
        let translucent: Vec<_> = BlockRenderPass::ALL
            .into_iter()
            .filter(|pass| pass.is_translucent())
            .collect();
        assert_eq!(translucent, vec![BlockRenderPass::Translucent]);
        assert_eq!(BlockRenderPass::from_index(2), Some(BlockRenderPass::Cutout));
        assert_eq!(BlockRenderPass::from_index(5), None);
    }
}
