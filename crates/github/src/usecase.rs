use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use tileboard_core::{ApiError, ParamsSchema, Tile, TileParams, TileStatus};

use crate::models::{ChecksParams, CountParams};
use crate::{checks_tile_type, count_tile_type};

const CHECK_STATUSES: &[TileStatus] = &[
    TileStatus::Success,
    TileStatus::Success,
    TileStatus::Failure,
    TileStatus::Running,
    TileStatus::Queued,
    TileStatus::ActionRequired,
];

/// Same input, same tile
fn rng_for(input: &str) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&hasher.finalize());
    ChaCha8Rng::from_seed(seed)
}

/// Generates GitHub tiles without calling GitHub
#[derive(Debug, Clone, Default)]
pub struct GithubFakerUsecase;

impl GithubFakerUsecase {
    pub fn count(&self, params: &TileParams) -> Result<Tile, ApiError> {
        let params = ParamsSchema::<CountParams>::new().parse(params)?;
        let count: u32 = rng_for(&params.query).gen_range(0..50);

        let status = if count == 0 {
            TileStatus::Success
        } else {
            TileStatus::Warning
        };
        Ok(Tile::new(count_tile_type(), status)
            .with_label(&params.query)
            .with_value(count))
    }

    pub fn checks(&self, params: &TileParams) -> Result<Tile, ApiError> {
        let params = ParamsSchema::<ChecksParams>::new().parse(params)?;
        let slug = params.slug();
        let mut rng = rng_for(&slug);
        let status = CHECK_STATUSES[rng.gen_range(0..CHECK_STATUSES.len())];

        let mut tile = Tile::new(checks_tile_type(), status).with_label(&slug);
        if status == TileStatus::Running {
            tile = tile.with_value(format!("{}s", rng.gen_range(10..600)));
        }
        Ok(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileboard_core::ValidationError;

    #[test]
    fn test_count_is_stable_per_query() {
        let usecase = GithubFakerUsecase;
        let params = TileParams::new().with("query", "is:pr is:open");

        let a = usecase.count(&params).unwrap();
        let b = usecase.count(&params).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.label.as_deref(), Some("is:pr is:open"));
        assert_eq!(a.values.len(), 1);
    }

    #[test]
    fn test_checks_requires_every_param() {
        let usecase = GithubFakerUsecase;
        let params = TileParams::new()
            .with("owner", "tileboard")
            .with("repository", "tileboard")
            .with("ref", " ");

        assert!(matches!(
            usecase.checks(&params),
            Err(ApiError::InvalidParams(ValidationError::MissingParam(p))) if p == "ref"
        ));
    }

    #[test]
    fn test_checks_tile_label() {
        let tile = GithubFakerUsecase
            .checks(
                &TileParams::new()
                    .with("owner", "tileboard")
                    .with("repository", "core")
                    .with("ref", "main"),
            )
            .unwrap();

        assert_eq!(tile.label.as_deref(), Some("tileboard/core@main"));
        assert_eq!(tile.tile_type, checks_tile_type());
    }
}
