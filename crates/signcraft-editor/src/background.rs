//! Region background compositing.
//!
//! A background is scoped to one region instance: it covers the region's
//! bounding box, sits directly below it, is locked against interaction and
//! is linked to the region by object id. A region has at most one.

use crate::adapter::{SceneAdapter, TemplateMetadata, failure_paint, lock_instance, placeholder_paint};
use crate::error::EditorError;
use crate::images::{ImageLoader, ImagePurpose, UploadedFile};
use signcraft_core::css;
use signcraft_core::geometry::{Bounds, FitMode, Size};
use signcraft_core::model::{Geometry, Paint, PaintStyle};
use signcraft_core::template::{BackgroundPreset, PresetKind};
use signcraft_core::{EditorConfig, ObjectId};
use signcraft_render::{ImageContent, Instance, InstanceId, InstanceKind, Surface};
use std::sync::Arc;

/// Owned by the editing session.
#[derive(Debug, Clone)]
pub struct BackgroundService {
    max_upload_bytes: u64,
}

impl BackgroundService {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Resolve the region for the current selection. The region gets an
    /// object id stamped if it has none yet.
    fn region(
        &self,
        surface: &Surface,
        adapter: &mut SceneAdapter,
        selection: Option<InstanceId>,
    ) -> Result<(InstanceId, ObjectId, Bounds), EditorError> {
        let id = selection.ok_or(EditorError::NoSelection)?;
        let bounds = surface.bounds(id).ok_or(EditorError::NoSelection)?;
        let object_id = match adapter.metadata(id) {
            Some(meta) => meta.object_id,
            None => {
                let kind = surface.get(id).map_or("object", |i| i.kind.name());
                let meta = TemplateMetadata::added(kind);
                let object_id = meta.object_id;
                adapter.stamp(id, meta);
                object_id
            }
        };
        Ok((id, object_id, bounds))
    }

    /// Insert `inst` as the background of `region`, replacing any prior one.
    fn install(
        &self,
        surface: &mut Surface,
        adapter: &mut SceneAdapter,
        region: InstanceId,
        linked: ObjectId,
        mut inst: Instance,
    ) -> Option<InstanceId> {
        self.remove_for(surface, adapter, Some(region)).ok();
        lock_instance(&mut inst);
        let id = surface.insert_below(region, inst)?;
        adapter.stamp(id, TemplateMetadata::background(linked));
        log::debug!("background: {id:?} behind {region:?} ({linked})");
        Some(id)
    }

    /// Apply a catalog preset behind the selected region. Image presets
    /// start as a placeholder and queue a load.
    pub fn apply_preset(
        &self,
        surface: &mut Surface,
        adapter: &mut SceneAdapter,
        loader: &mut ImageLoader,
        selection: Option<InstanceId>,
        preset: &BackgroundPreset,
    ) -> Result<InstanceId, EditorError> {
        let (region, linked, bounds) = self.region(surface, adapter, selection)?;
        let geometry = Geometry::new(bounds.x, bounds.y, bounds.width, bounds.height);

        let paint = match preset.kind {
            PresetKind::Solid => css::parse_color(&preset.value).map(PaintStyle::filled),
            // The surface has no pattern paint; patterns fall back to a
            // gradient across their stops.
            PresetKind::Gradient | PresetKind::Pattern => css::parse_gradient(&preset.value).map(|g| {
                let from = g.stops.first().map(|s| s.color);
                let to = g.stops.last().map(|s| s.color);
                let mut paint = PaintStyle::default();
                if let (Some(from), Some(to)) = (from, to) {
                    paint.fill = Some(Paint::diagonal_gradient(bounds.width, bounds.height, from, to));
                }
                paint
            }),
            PresetKind::Image => {
                let inst = Instance::new(InstanceKind::Rect, geometry).with_paint(placeholder_paint());
                let id = self
                    .install(surface, adapter, region, linked, inst)
                    .ok_or(EditorError::NoSelection)?;
                loader.request(
                    preset.value.clone(),
                    id,
                    ImagePurpose::RegionBackground {
                        region,
                        mode: FitMode::Cover,
                    },
                );
                return Ok(id);
            }
        };

        let paint = paint.unwrap_or_else(|e| {
            log::warn!("background: preset {}: {e}", preset.id);
            failure_paint()
        });
        let inst = Instance::new(InstanceKind::Rect, geometry).with_paint(paint);
        self.install(surface, adapter, region, linked, inst)
            .ok_or(EditorError::NoSelection)
    }

    /// Composite an uploaded image behind the selected region. The file is
    /// validated before anything changes; an undecodable file leaves a
    /// red-tinted placeholder.
    pub fn apply_image(
        &self,
        surface: &mut Surface,
        adapter: &mut SceneAdapter,
        selection: Option<InstanceId>,
        file: &UploadedFile,
        mode: FitMode,
    ) -> Result<InstanceId, EditorError> {
        selection.ok_or(EditorError::NoSelection)?;
        file.validate(self.max_upload_bytes)?;
        let (region, linked, bounds) = self.region(surface, adapter, selection)?;

        let inst = match file.load(self.max_upload_bytes) {
            Ok(image) => {
                let natural = Size::new(image.width as f32, image.height as f32);
                let placed = mode.place(natural, bounds);
                let src = file.data_uri();
                let inst = Instance::new(
                    InstanceKind::Image(ImageContent {
                        src: src.clone(),
                        natural_width: image.width,
                        natural_height: image.height,
                        filters: Default::default(),
                    }),
                    Geometry::new(placed.x, placed.y, placed.width, placed.height),
                );
                surface.cache_image(src, Arc::new(image));
                inst
            }
            Err(e) => {
                log::warn!("background: {e}");
                Instance::new(
                    InstanceKind::Rect,
                    Geometry::new(bounds.x, bounds.y, bounds.width, bounds.height),
                )
                .with_paint(failure_paint())
            }
        };
        self.install(surface, adapter, region, linked, inst)
            .ok_or(EditorError::NoSelection)
    }

    /// Remove the backgrounds linked to the selected region only.
    pub fn remove_for(
        &self,
        surface: &mut Surface,
        adapter: &mut SceneAdapter,
        selection: Option<InstanceId>,
    ) -> Result<usize, EditorError> {
        let id = selection.ok_or(EditorError::NoSelection)?;
        let Some(object_id) = adapter.metadata(id).map(|m| m.object_id) else {
            return Ok(0);
        };
        let ids = adapter.backgrounds_for(object_id);
        Ok(remove_ids(surface, adapter, ids))
    }

    /// Remove every region background.
    pub fn remove_all(&self, surface: &mut Surface, adapter: &mut SceneAdapter) -> usize {
        let ids = adapter.all_backgrounds();
        remove_ids(surface, adapter, ids)
    }
}

fn remove_ids(surface: &mut Surface, adapter: &mut SceneAdapter, ids: Vec<InstanceId>) -> usize {
    let mut removed = 0;
    for id in ids {
        adapter.forget(id);
        if surface.remove(id).is_some() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use signcraft_core::TemplateStore;

    fn setup() -> (Surface, SceneAdapter, ImageLoader, TemplateStore) {
        let store = TemplateStore::builtin().unwrap();
        let mut surface = Surface::new(800.0, 600.0);
        let mut adapter = SceneAdapter::new();
        let mut loader = ImageLoader::new();
        let template = store.by_id("open-closed-sign").unwrap().clone();
        adapter.load_template(&mut surface, &template, true, &EditorConfig::default(), &mut loader);
        (surface, adapter, loader, store)
    }

    #[test]
    fn requires_a_selection() {
        let (mut surface, mut adapter, mut loader, store) = setup();
        let svc = BackgroundService::new(&EditorConfig::default());
        let preset = store.background_preset("ocean").unwrap();
        let before = surface.snapshot();
        assert_eq!(
            svc.apply_preset(&mut surface, &mut adapter, &mut loader, None, preset),
            Err(EditorError::NoSelection)
        );
        assert_eq!(surface.snapshot(), before);
    }

    #[test]
    fn gradient_sits_below_region_and_replaces_previous() {
        let (mut surface, mut adapter, mut loader, store) = setup();
        let svc = BackgroundService::new(&EditorConfig::default());
        let border = adapter
            .find_by_object_id(&surface, ObjectId::intern("border"))
            .unwrap();
        let ocean = store.background_preset("ocean").unwrap();
        let bg = svc
            .apply_preset(&mut surface, &mut adapter, &mut loader, Some(border), ocean)
            .unwrap();
        assert_eq!(surface.position(bg).unwrap() + 1, surface.position(border).unwrap());
        assert_eq!(surface.bounds(bg), surface.bounds(border));
        let inst = surface.get(bg).unwrap();
        assert!(!inst.selectable && !inst.evented && inst.locks.any());
        assert!(matches!(inst.paint.fill, Some(Paint::LinearGradient { .. })));

        let white = store.background_preset("white").unwrap();
        let bg2 = svc
            .apply_preset(&mut surface, &mut adapter, &mut loader, Some(border), white)
            .unwrap();
        assert!(!surface.contains(bg));
        assert_eq!(adapter.backgrounds_for(ObjectId::intern("border")), vec![bg2]);
    }

    #[test]
    fn image_preset_queues_a_load() {
        let (mut surface, mut adapter, mut loader, store) = setup();
        let svc = BackgroundService::new(&EditorConfig::default());
        let border = adapter
            .find_by_object_id(&surface, ObjectId::intern("border"))
            .unwrap();
        let wood = store.background_preset("wood").unwrap();
        let bg = svc
            .apply_preset(&mut surface, &mut adapter, &mut loader, Some(border), wood)
            .unwrap();
        let requests = loader.drain_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, bg);
        assert_eq!(requests[0].src, "/assets/backgrounds/wood.jpg");
    }

    #[test]
    fn undecodable_upload_leaves_failure_placeholder() {
        let (mut surface, mut adapter, _, _) = setup();
        let svc = BackgroundService::new(&EditorConfig::default());
        let border = adapter
            .find_by_object_id(&surface, ObjectId::intern("border"))
            .unwrap();
        let junk = UploadedFile::new("bg.png", "image/png", vec![0, 1, 2]);
        let bg = svc
            .apply_image(&mut surface, &mut adapter, Some(border), &junk, FitMode::Cover)
            .unwrap();
        assert_eq!(surface.get(bg).unwrap().paint, failure_paint());

        let pdf = UploadedFile::new("bg.pdf", "application/pdf", vec![0]);
        assert_eq!(
            svc.apply_image(&mut surface, &mut adapter, Some(border), &pdf, FitMode::Cover),
            Err(EditorError::InvalidFileType("bg.pdf".into()))
        );
        // The rejected file did not touch the existing background.
        assert!(surface.contains(bg));
    }
}
