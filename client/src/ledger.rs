//! Seam to the on-chain ledger that makes placements authoritative.

use std::future::Future;

use common::wire::DevnetPlacePixel;
use common::ColorId;

use crate::service::HttpCanvasService;

pub const PLACE_PIXEL_ENTRYPOINT: &str = "place_pixel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementArgs {
    pub world_id: Option<u32>,
    pub position: u32,
    pub color: ColorId,
    /// Unix seconds.
    pub now: u64,
}

/// Which deployed contract a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    Canvas,
    Worlds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub contract: Contract,
    pub entrypoint: &'static str,
    pub calldata: Vec<u64>,
}

impl Call {
    /// `place_pixel(pos, color, now)` on the canvas contract, or
    /// `place_pixel(canvas_id, pos, color, now)` on the worlds contract.
    pub fn place_pixel(args: &PlacementArgs) -> Self {
        let tail = [args.position as u64, args.color as u64, args.now];
        match args.world_id {
            None => Call {
                contract: Contract::Canvas,
                entrypoint: PLACE_PIXEL_ENTRYPOINT,
                calldata: tail.to_vec(),
            },
            Some(world_id) => Call {
                contract: Contract::Worlds,
                entrypoint: PLACE_PIXEL_ENTRYPOINT,
                calldata: std::iter::once(world_id as u64).chain(tail).collect(),
            },
        }
    }

    /// Inverse of [`Call::place_pixel`].
    pub fn placement_args(&self) -> Option<PlacementArgs> {
        if self.entrypoint != PLACE_PIXEL_ENTRYPOINT {
            return None;
        }
        let (world_id, rest) = match (self.contract, self.calldata.as_slice()) {
            (Contract::Canvas, rest) => (None, rest),
            (Contract::Worlds, [world_id, rest @ ..]) => {
                (Some(u32::try_from(*world_id).ok()?), rest)
            }
            (Contract::Worlds, []) => return None,
        };
        match rest {
            [position, color, now] => Some(PlacementArgs {
                world_id,
                position: u32::try_from(*position).ok()?,
                color: ColorId::try_from(*color).ok()?,
                now: *now,
            }),
            _ => None,
        }
    }
}

pub trait Ledger: Send + Sync + 'static {
    fn populate(&self, args: &PlacementArgs) -> Call {
        Call::place_pixel(args)
    }

    fn estimate_invoke_fee(&self, call: &Call) -> impl Future<Output = anyhow::Result<u128>> + Send;

    /// Submit the call; resolves to a transaction identifier.
    fn invoke(&self, call: Call, max_fee: u128) -> impl Future<Output = anyhow::Result<String>> + Send;

    /// Whether accepted placements still need a backend cache notification.
    fn mirrors_to_backend(&self) -> bool {
        true
    }
}

/// Fee ceiling: `floor(suggested * 15 / 10)` in integer arithmetic, computed
/// without the intermediate product.
pub fn max_fee(suggested: u128) -> u128 {
    suggested.saturating_add(suggested / 2)
}

/// Populate, estimate, then invoke with the bounded fee.
pub async fn submit<L: Ledger>(ledger: &L, args: &PlacementArgs) -> anyhow::Result<String> {
    let call = ledger.populate(args);
    let suggested = ledger.estimate_invoke_fee(&call).await?;
    let fee = max_fee(suggested);
    tracing::debug!(
        "Invoking {} at {} (suggested fee {}, max fee {})",
        call.entrypoint,
        args.position,
        suggested,
        fee
    );
    ledger.invoke(call, fee).await
}

/// Ledger stand-in for environments without a live chain: placements go
/// straight to the backend's devnet routes.
#[derive(Clone)]
pub struct DevnetLedger {
    service: HttpCanvasService,
}

impl DevnetLedger {
    pub fn new(service: HttpCanvasService) -> Self {
        Self { service }
    }
}

impl Ledger for DevnetLedger {
    async fn estimate_invoke_fee(&self, _call: &Call) -> anyhow::Result<u128> {
        Ok(0)
    }

    async fn invoke(&self, call: Call, _max_fee: u128) -> anyhow::Result<String> {
        let args = call
            .placement_args()
            .ok_or_else(|| anyhow::anyhow!("unsupported devnet call: {}", call.entrypoint))?;
        let body = DevnetPlacePixel::new(args.world_id, args.position, args.color, args.now);
        self.service.place_pixel_devnet(args.world_id, &body).await?;
        Ok(format!("devnet:{}", args.position))
    }

    fn mirrors_to_backend(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_fee_is_floor_of_one_and_a_half() {
        assert_eq!(max_fee(0), 0);
        assert_eq!(max_fee(1), 1);
        assert_eq!(max_fee(3), 4);
        assert_eq!(max_fee(10), 15);
        assert_eq!(max_fee(1_000_000_000_000_000_001), 1_500_000_000_000_000_001);
    }

    #[test]
    fn max_fee_stays_exact_past_the_product_overflow() {
        let q = u128::MAX / 15;
        // `2q * 15` overflows u128, the ceiling must not.
        assert!((2 * q).checked_mul(15).is_none());
        assert_eq!(max_fee(2 * q), 3 * q);
        assert_eq!(max_fee(2 * q + 1), 3 * q + 1);
    }

    #[test]
    fn world_calls_prefix_canvas_id() {
        let args = PlacementArgs {
            world_id: Some(7),
            position: 1030,
            color: 4,
            now: 1_700_000_000,
        };
        let call = Call::place_pixel(&args);
        assert_eq!(call.contract, Contract::Worlds);
        assert_eq!(call.calldata, vec![7, 1030, 4, 1_700_000_000]);
        assert_eq!(call.placement_args(), Some(args));

        let main = PlacementArgs {
            world_id: None,
            ..args
        };
        let call = Call::place_pixel(&main);
        assert_eq!(call.contract, Contract::Canvas);
        assert_eq!(call.calldata, vec![1030, 4, 1_700_000_000]);
        assert_eq!(call.placement_args(), Some(main));
    }

    #[test]
    fn malformed_calldata_does_not_decode() {
        let call = Call {
            contract: Contract::Canvas,
            entrypoint: PLACE_PIXEL_ENTRYPOINT,
            calldata: vec![1, 300, 5],
        };
        assert_eq!(call.placement_args(), None);
    }
}
