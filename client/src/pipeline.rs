//! Selection -> quota check -> optimistic paint -> ledger and backend
//! submission -> settle or roll back.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use common::wire::PlacePixelNotice;
use common::ColorId;
use tokio::sync::{Mutex, RwLock};

use crate::error::PlacementError;
use crate::ledger::{self, Ledger, PlacementArgs};
use crate::overlay::ExtraPixel;
use crate::pixel_info::PixelInfoCache;
use crate::quota::{Lane, QuotaReject};
use crate::service::CanvasService;
use crate::store::{Action, Mode, Selection, Store};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Outside the grid, or a creation mode owns the click.
    Ignored,
    /// Inspect-mode click on the already selected cell.
    Deselected,
    /// Selected for inspection, with the placer when known.
    Inspected(Option<String>),
    /// Eraser click; `true` if a pending extra pixel was removed.
    Erased(bool),
    Rejected(QuotaReject),
    /// Drawn into the extra-pixel overlay.
    Buffered,
    /// Accepted by the ledger.
    Settled { position: u32, tx: String },
}

/// What is left of a click or hover once its store transition is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Done(PlacementOutcome),
    Remote(RemoteStep),
}

/// The network half of an interaction, run by [`PlacementPipeline::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStep(Remote);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Remote {
    Inspect { world_id: Option<u32>, position: u32 },
    Submit { world_id: Option<u32>, position: u32, color: ColorId },
}

pub struct PlacementPipeline<L, S> {
    store: Arc<RwLock<Store>>,
    ledger: Arc<L>,
    service: Arc<S>,
    pixel_info: Arc<Mutex<PixelInfoCache>>,
    address: Option<String>,
}

impl<L, S> Clone for PlacementPipeline<L, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ledger: self.ledger.clone(),
            service: self.service.clone(),
            pixel_info: self.pixel_info.clone(),
            address: self.address.clone(),
        }
    }
}

impl<L: Ledger, S: CanvasService> PlacementPipeline<L, S> {
    pub fn new(
        store: Store,
        ledger: L,
        service: S,
        address: Option<String>,
        pixel_info_cache_size: usize,
    ) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            ledger: Arc::new(ledger),
            service: Arc::new(service),
            pixel_info: Arc::new(Mutex::new(PixelInfoCache::new(pixel_info_cache_size))),
            address,
        }
    }

    pub fn store(&self) -> &Arc<RwLock<Store>> {
        &self.store
    }

    pub fn pixel_info_cache(&self) -> &Arc<Mutex<PixelInfoCache>> {
        &self.pixel_info
    }

    pub async fn dispatch(&self, action: Action) -> bool {
        self.store.write().await.reduce(action)
    }

    /// A click on grid cell `(x, y)`, waiting for any network round-trip.
    pub async fn click(&self, x: u32, y: u32) -> Result<PlacementOutcome, PlacementError> {
        match self.begin_click(x, y).await {
            Step::Done(outcome) => Ok(outcome),
            Step::Remote(remote) => self.finish(remote).await,
        }
    }

    /// Apply the store side of a click. Only the returned remote step
    /// touches the network.
    pub async fn begin_click(&self, x: u32, y: u32) -> Step {
        let mut store = self.store.write().await;
        Self::decide_click(&mut store, x, y)
    }

    /// Run the ledger submission or placer lookup left by a click or hover.
    pub async fn finish(&self, remote: RemoteStep) -> Result<PlacementOutcome, PlacementError> {
        match remote.0 {
            Remote::Inspect { world_id, position } => {
                Ok(PlacementOutcome::Inspected(self.inspect(world_id, position).await))
            }
            Remote::Submit {
                world_id,
                position,
                color,
            } => self.submit(world_id, position, color).await,
        }
    }

    fn decide_click(store: &mut Store, x: u32, y: u32) -> Step {
        let Some(position) = store.canvas().position(x, y) else {
            return Step::Done(PlacementOutcome::Ignored);
        };
        let mode = store.mode();
        if mode.suppresses_placement() {
            return Step::Done(PlacementOutcome::Ignored);
        }
        if mode == Mode::Eraser {
            let erased = store.reduce(Action::EraseExtraPixel { x, y });
            return Step::Done(PlacementOutcome::Erased(erased));
        }

        let Some(color) = store.selected_color() else {
            if store.selection() == Some(Selection { x, y }) {
                store.reduce(Action::ClearSelection);
                return Step::Done(PlacementOutcome::Deselected);
            }
            store.reduce(Action::SelectPixel { x, y });
            if store.overlay().contains(x, y) {
                store.reduce(Action::SetPixelInfo(None));
                return Step::Done(PlacementOutcome::Inspected(None));
            }
            return Step::Remote(RemoteStep(Remote::Inspect {
                world_id: store.world_id(),
                position,
            }));
        };

        store.reduce(Action::SelectPixel { x, y });
        store.reduce(Action::SetPixelInfo(None));
        match store.quota().lane() {
            Err(reject) => Step::Done(PlacementOutcome::Rejected(reject)),
            Ok(Lane::Bonus) => {
                // Color stays selected so several bonus pixels can follow.
                store.reduce(Action::BufferExtraPixels(vec![ExtraPixel { x, y, color }]));
                Step::Done(PlacementOutcome::Buffered)
            }
            Ok(Lane::Base) => {
                store.reduce(Action::ConfirmPlacement { position, color });
                Step::Remote(RemoteStep(Remote::Submit {
                    world_id: store.world_id(),
                    position,
                    color,
                }))
            }
        }
    }

    /// Pointer movement over grid cell `(x, y)`, waiting for the lookup.
    pub async fn hover(&self, x: u32, y: u32) -> Option<String> {
        match self.begin_hover(x, y).await {
            Step::Remote(remote) => match self.finish(remote).await {
                Ok(PlacementOutcome::Inspected(placed_by)) => placed_by,
                _ => None,
            },
            Step::Done(_) => None,
        }
    }

    /// Apply the store side of a hover. Pending bonus cells and the eraser
    /// answer locally; other cells leave a placer lookup.
    pub async fn begin_hover(&self, x: u32, y: u32) -> Step {
        let mut store = self.store.write().await;
        let Some(position) = store.canvas().position(x, y) else {
            return Step::Done(PlacementOutcome::Ignored);
        };
        if store.mode().suppresses_placement() {
            return Step::Done(PlacementOutcome::Ignored);
        }
        if store.selected_color().is_some() {
            store.reduce(Action::SelectPixel { x, y });
            store.reduce(Action::SetPixelInfo(None));
            return Step::Done(PlacementOutcome::Inspected(None));
        }
        if store.mode() == Mode::Eraser || store.overlay().contains(x, y) {
            store.reduce(Action::SetPixelInfo(None));
            return Step::Done(PlacementOutcome::Inspected(None));
        }
        Step::Remote(RemoteStep(Remote::Inspect {
            world_id: store.world_id(),
            position,
        }))
    }

    async fn inspect(&self, world_id: Option<u32>, position: u32) -> Option<String> {
        let cached = self.pixel_info.lock().await.get(world_id, position);
        let placed_by = match cached {
            Some(hit) => Some(hit),
            None => {
                let fetched = self.service.pixel_info(world_id, position).await;
                if let Some(placed_by) = &fetched {
                    self.pixel_info
                        .lock()
                        .await
                        .put(world_id, position, placed_by.clone());
                }
                fetched
            }
        };
        self.store
            .write()
            .await
            .reduce(Action::SetPixelInfo(placed_by.clone()));
        placed_by
    }

    /// Base lane placement that bypasses selection, for automated callers.
    pub async fn place_base(
        &self,
        position: u32,
        color: ColorId,
    ) -> Result<PlacementOutcome, PlacementError> {
        let world_id = {
            let mut store = self.store.write().await;
            let quota = store.quota();
            if !quota.is_logged_in() {
                return Ok(PlacementOutcome::Rejected(QuotaReject::LoggedOut));
            }
            if !quota.base_pixel_up() {
                return Ok(PlacementOutcome::Rejected(QuotaReject::Cooling));
            }
            if !store.reduce(Action::ConfirmPlacement { position, color }) {
                return Ok(PlacementOutcome::Ignored);
            }
            store.world_id()
        };
        self.submit(world_id, position, color).await
    }

    /// Bonus lane batch. Returns how many pixels were buffered.
    pub async fn buffer_extra(&self, pixels: Vec<ExtraPixel>) -> usize {
        let mut store = self.store.write().await;
        if !store.quota().is_logged_in() {
            return 0;
        }
        let before = store.overlay().len();
        store.reduce(Action::BufferExtraPixels(pixels));
        store.overlay().len() - before
    }

    /// The asynchronous half of the base lane. The optimistic paint has
    /// already been applied.
    async fn submit(
        &self,
        world_id: Option<u32>,
        position: u32,
        color: ColorId,
    ) -> Result<PlacementOutcome, PlacementError> {
        let now = unix_now_secs();
        let args = PlacementArgs {
            world_id,
            position,
            color,
            now,
        };

        let tx = match ledger::submit(self.ledger.as_ref(), &args).await {
            Ok(tx) => tx,
            Err(e) => {
                tracing::error!("Ledger rejected placement at {}: {:#}", position, e);
                self.store
                    .write()
                    .await
                    .reduce(Action::FailPlacement { position });
                tracing::warn!("Rolled back optimistic paint at {}", position);
                return Err(PlacementError::ledger(position, e));
            }
        };

        if self.ledger.mirrors_to_backend() {
            self.notify_backend(world_id, position, color).await;
        }
        self.pixel_info.lock().await.invalidate(world_id, position);

        self.store.write().await.reduce(Action::SettlePlacement {
            position,
            now_ms: now * 1000,
        });
        Ok(PlacementOutcome::Settled { position, tx })
    }

    /// Fire-and-forget: the ledger stays authoritative.
    async fn notify_backend(&self, world_id: Option<u32>, position: u32, color: ColorId) {
        let Some(address) = &self.address else {
            return;
        };
        let notice = PlacePixelNotice {
            world_id,
            position,
            color,
            address: address.clone(),
        };
        if let Err(e) = self.service.notify_placement(&notice).await {
            tracing::warn!("Failed to notify backend of placement at {}: {}", position, e);
        }
    }
}

pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use common::{Canvas, Palette};

    use super::*;
    use crate::ledger::Call;
    use crate::quota::Quota;
    use crate::store::Phase;

    #[derive(Default)]
    pub(crate) struct RecordingLedger {
        pub calls: std::sync::Mutex<Vec<(Call, u128)>>,
        pub fail: bool,
        pub delay: Option<Duration>,
    }

    impl Ledger for RecordingLedger {
        async fn estimate_invoke_fee(&self, _call: &Call) -> anyhow::Result<u128> {
            Ok(1001)
        }

        async fn invoke(&self, call: Call, max_fee: u128) -> anyhow::Result<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                anyhow::bail!("insufficient max fee");
            }
            let tx = format!("0x{}", call.calldata.len());
            self.calls.lock().unwrap().push((call, max_fee));
            Ok(tx)
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeService {
        pub notices: std::sync::Mutex<Vec<PlacePixelNotice>>,
        pub placed_by: Option<String>,
        pub lookups: AtomicUsize,
        pub fail_notify: bool,
    }

    impl CanvasService for FakeService {
        async fn pixel_info(&self, _world_id: Option<u32>, _position: u32) -> Option<String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.placed_by.clone()
        }

        async fn notify_placement(&self, notice: &PlacePixelNotice) -> anyhow::Result<()> {
            if self.fail_notify {
                anyhow::bail!("connection refused");
            }
            self.notices.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    pub(crate) fn palette() -> Palette {
        Palette::new(
            ["FAFAFA", "080808", "BA2112", "FF0000", "00FF00"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
    }

    pub(crate) fn pipeline(
        ledger: RecordingLedger,
        service: FakeService,
    ) -> PlacementPipeline<RecordingLedger, FakeService> {
        let store = Store::new(None, Canvas::new(518, 396), palette(), Quota::new(true));
        PlacementPipeline::new(store, ledger, service, Some("0xabc".into()), 16)
    }

    #[tokio::test]
    async fn base_lane_submits_paints_and_notifies() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::SelectColor(Some(3))).await;

        let outcome = pipeline.click(10, 2).await.unwrap();

        let position = 2 * 518 + 10;
        assert!(matches!(outcome, PlacementOutcome::Settled { position: p, .. } if p == position));
        let calls = pipeline.ledger.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, 1501);
        assert_eq!(&calls[0].0.calldata[..2], &[position as u64, 3]);

        let notices = pipeline.service.notices.lock().unwrap().clone();
        assert_eq!(notices[0].position, position);
        assert_eq!(notices[0].world_id, None);

        let store = pipeline.store().read().await;
        assert_eq!(store.canvas().get(10, 2), Some(3));
        assert_eq!(store.selected_color(), None);
        assert_eq!(store.selection(), None);
        assert_eq!(store.phase(), Phase::Settled);
        assert!(store.quota().last_placed_time().is_some());
        assert!(!store.quota().base_pixel_up());
    }

    #[tokio::test]
    async fn ledger_rejection_propagates_and_rolls_back() {
        let ledger = RecordingLedger {
            fail: true,
            ..Default::default()
        };
        let pipeline = pipeline(ledger, FakeService::default());
        pipeline.dispatch(Action::SelectColor(Some(2))).await;

        let err = pipeline.click(0, 0).await.unwrap_err();
        assert_eq!(err.position(), Some(0));
        assert!(err.to_string().contains("insufficient max fee"));

        let store = pipeline.store().read().await;
        assert_eq!(store.canvas().get(0, 0), Some(0));
        assert!(store.quota().base_pixel_up());
        assert_eq!(store.phase(), Phase::Failed);
        assert!(pipeline.service.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_swallowed() {
        let service = FakeService {
            fail_notify: true,
            ..Default::default()
        };
        let pipeline = pipeline(RecordingLedger::default(), service);
        pipeline.dispatch(Action::SelectColor(Some(1))).await;
        let outcome = pipeline.click(1, 1).await.unwrap();
        assert!(matches!(outcome, PlacementOutcome::Settled { .. }));
    }

    #[tokio::test]
    async fn bonus_lane_buffers_and_keeps_color() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::RefreshQuota { available_pixels: 3 }).await;
        pipeline.dispatch(Action::SelectColor(Some(4))).await;

        assert_eq!(pipeline.click(5, 5).await.unwrap(), PlacementOutcome::Buffered);
        assert_eq!(pipeline.click(6, 5).await.unwrap(), PlacementOutcome::Buffered);

        let store = pipeline.store().read().await;
        assert_eq!(store.selected_color(), Some(4));
        assert_eq!(store.overlay().color_at(5, 5), Some(4));
        assert_eq!(store.canvas().get(5, 5), Some(0));
        assert_eq!(store.quota().available_pixels_used(), 2);
        assert!(store.quota().base_pixel_up());
        assert!(pipeline.ledger.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhausted_bonus_goes_through_the_ledger() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::RefreshQuota { available_pixels: 2 }).await;
        pipeline
            .buffer_extra(vec![
                ExtraPixel { x: 0, y: 0, color: 1 },
                ExtraPixel { x: 1, y: 0, color: 1 },
            ])
            .await;
        pipeline.dispatch(Action::SelectColor(Some(3))).await;

        let outcome = pipeline.click(7, 7).await.unwrap();
        assert!(matches!(outcome, PlacementOutcome::Settled { .. }));
        assert_eq!(pipeline.ledger.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cooling_base_rejects_silently() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::SelectColor(Some(3))).await;
        pipeline.click(1, 1).await.unwrap();
        pipeline.dispatch(Action::SelectColor(Some(3))).await;
        assert_eq!(
            pipeline.click(2, 2).await.unwrap(),
            PlacementOutcome::Rejected(QuotaReject::Cooling)
        );
        assert_eq!(pipeline.store().read().await.canvas().get(2, 2), Some(0));
    }

    #[tokio::test]
    async fn concurrent_base_placements_cannot_double_spend() {
        let ledger = RecordingLedger {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let pipeline = pipeline(ledger, FakeService::default());
        let (first, second) = tokio::join!(pipeline.place_base(0, 1), pipeline.place_base(1, 1));
        assert!(matches!(first.unwrap(), PlacementOutcome::Settled { .. }));
        assert_eq!(second.unwrap(), PlacementOutcome::Rejected(QuotaReject::Cooling));
    }

    #[tokio::test]
    async fn begin_click_applies_the_optimistic_state_before_any_network_call() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::SelectColor(Some(3))).await;

        let Step::Remote(remote) = pipeline.begin_click(4, 0).await else {
            panic!("base lane click should leave a ledger submission");
        };
        {
            let store = pipeline.store().read().await;
            assert_eq!(store.canvas().get(4, 0), Some(3));
            assert_eq!(store.phase(), Phase::Submitting);
            assert!(pipeline.ledger.calls.lock().unwrap().is_empty());
        }

        pipeline.dispatch(Action::SelectColor(Some(1))).await;
        assert_eq!(
            pipeline.begin_click(5, 0).await,
            Step::Done(PlacementOutcome::Rejected(QuotaReject::Cooling))
        );

        let outcome = pipeline.finish(remote).await.unwrap();
        assert!(matches!(outcome, PlacementOutcome::Settled { position: 4, .. }));
    }

    #[tokio::test]
    async fn inspect_click_toggles_and_caches_lookups() {
        let service = FakeService {
            placed_by: Some("0xdef".into()),
            ..Default::default()
        };
        let pipeline = pipeline(RecordingLedger::default(), service);

        assert_eq!(
            pipeline.click(3, 3).await.unwrap(),
            PlacementOutcome::Inspected(Some("0xdef".into()))
        );
        assert_eq!(pipeline.click(3, 3).await.unwrap(), PlacementOutcome::Deselected);
        assert_eq!(pipeline.store().read().await.selection(), None);

        assert_eq!(pipeline.hover(3, 3).await.as_deref(), Some("0xdef"));
        assert_eq!(pipeline.service.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(
            pipeline.store().read().await.pixel_placed_by(),
            Some("0xdef")
        );
    }

    #[tokio::test]
    async fn hover_answers_locally_for_pending_cells_and_eraser() {
        let service = FakeService {
            placed_by: Some("0xdef".into()),
            ..Default::default()
        };
        let pipeline = pipeline(RecordingLedger::default(), service);
        pipeline.dispatch(Action::RefreshQuota { available_pixels: 3 }).await;
        pipeline
            .buffer_extra(vec![ExtraPixel { x: 4, y: 4, color: 2 }])
            .await;

        assert_eq!(pipeline.hover(4, 4).await, None);
        pipeline.dispatch(Action::SetMode(Mode::Eraser)).await;
        assert_eq!(pipeline.hover(9, 9).await, None);
        assert_eq!(pipeline.service.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hover_with_color_selects_the_cell() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::SelectColor(Some(1))).await;
        assert_eq!(pipeline.hover(8, 9).await, None);
        assert_eq!(
            pipeline.store().read().await.selection(),
            Some(Selection { x: 8, y: 9 })
        );
    }

    #[tokio::test]
    async fn eraser_click_removes_pending_pixel_and_exits_when_empty() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::RefreshQuota { available_pixels: 3 }).await;
        pipeline
            .buffer_extra(vec![ExtraPixel { x: 4, y: 4, color: 2 }])
            .await;
        pipeline.dispatch(Action::SetMode(Mode::Eraser)).await;

        assert_eq!(pipeline.click(5, 5).await.unwrap(), PlacementOutcome::Erased(false));
        assert_eq!(pipeline.click(4, 4).await.unwrap(), PlacementOutcome::Erased(true));
        let store = pipeline.store().read().await;
        assert!(store.overlay().is_empty());
        assert_eq!(store.mode(), Mode::Normal);
        assert_eq!(store.quota().available_pixels_used(), 0);
    }

    #[tokio::test]
    async fn creation_modes_and_out_of_bounds_are_ignored() {
        let pipeline = pipeline(RecordingLedger::default(), FakeService::default());
        pipeline.dispatch(Action::SelectColor(Some(1))).await;
        assert_eq!(pipeline.click(518, 0).await.unwrap(), PlacementOutcome::Ignored);
        pipeline
            .dispatch(Action::SetMode(Mode::TemplateCreation { selected: false }))
            .await;
        assert_eq!(pipeline.click(1, 1).await.unwrap(), PlacementOutcome::Ignored);
        assert!(pipeline.ledger.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn logged_out_users_cannot_place() {
        let store = Store::new(None, Canvas::new(4, 4), palette(), Quota::new(false));
        let pipeline = PlacementPipeline::new(
            store,
            RecordingLedger::default(),
            FakeService::default(),
            None,
            4,
        );
        pipeline.dispatch(Action::SelectColor(Some(1))).await;
        assert_eq!(
            pipeline.click(1, 1).await.unwrap(),
            PlacementOutcome::Rejected(QuotaReject::LoggedOut)
        );
        assert_eq!(pipeline.buffer_extra(vec![ExtraPixel { x: 0, y: 0, color: 1 }]).await, 0);
    }
}
