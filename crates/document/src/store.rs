//! Ordered layer store.
//!
//! The store is the single source of truth for one open document. It owns
//! every layer; other components only borrow read access. Order in the
//! store is paint order: the first layer is painted first and therefore
//! sits at the bottom of the composite.

use crate::events::{ChangeEvent, ChangeNotifier, LayerAspect, SubscriberId};
use crate::layer::{Layer, LayerContent, LayerId};
use common::geometry::Point;
use slotmap::SlotMap;
use smallvec::SmallVec;
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("no layer for handle {0:?}")]
    NotFound(LayerId),

    #[error("index {index} out of range for {len} layers")]
    OutOfRange { index: usize, len: usize },
}

/// An ordered collection of layers with change notification.
#[derive(Debug, Default)]
pub struct LayerStore {
    layers: SlotMap<LayerId, Layer>,
    /// Paint order, bottom-most first.
    order: Vec<LayerId>,
    notifier: ChangeNotifier,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for store events.
    pub fn subscribe(&mut self, handler: impl FnMut(&ChangeEvent) + 'static) -> SubscriberId {
        self.notifier.subscribe(handler)
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Add a layer at the end of the paint order (on top). Always succeeds.
    pub fn append(&mut self, layer: Layer) -> LayerId {
        let index = self.order.len();
        self.notifier.emit(&ChangeEvent::AboutToInsert { index });

        tracing::debug!(name = %layer.name, index, "layer appended");
        let id = self.layers.insert(layer);
        self.order.push(id);

        self.notifier.emit(&ChangeEvent::Inserted { id });
        id
    }

    /// Add a layer at an arbitrary paint-order position. The layer paints
    /// above exactly the `index` layers before it. `index == len` is an
    /// append.
    pub fn insert(&mut self, index: usize, layer: Layer) -> Result<LayerId, StoreError> {
        if index > self.order.len() {
            return Err(StoreError::OutOfRange {
                index,
                len: self.order.len(),
            });
        }

        self.notifier.emit(&ChangeEvent::AboutToInsert { index });

        tracing::debug!(name = %layer.name, index, "layer inserted");
        let id = self.layers.insert(layer);
        self.order.insert(index, id);

        self.notifier.emit(&ChangeEvent::Inserted { id });
        Ok(id)
    }

    /// Remove a layer, handing it back to the caller.
    pub fn remove(&mut self, id: LayerId) -> Result<Layer, StoreError> {
        let index = self.index_of(id).ok_or(StoreError::NotFound(id))?;

        self.notifier.emit(&ChangeEvent::AboutToRemove { index });

        self.order.remove(index);
        let layer = self.layers.remove(id).ok_or(StoreError::NotFound(id))?;
        tracing::debug!(name = %layer.name, index, "layer removed");

        self.notifier.emit(&ChangeEvent::Removed { id });

        // The observable selection set shrank.
        if layer.selected {
            let selected = self.selected();
            self.notifier.emit(&ChangeEvent::SelectionChanged { selected });
        }

        Ok(layer)
    }

    /// Move a layer to a new paint-order position.
    pub fn move_layer(&mut self, id: LayerId, new_index: usize) -> Result<(), StoreError> {
        let from = self.index_of(id).ok_or(StoreError::NotFound(id))?;

        if new_index >= self.order.len() {
            return Err(StoreError::OutOfRange {
                index: new_index,
                len: self.order.len(),
            });
        }

        if from != new_index {
            let moved = self.order.remove(from);
            self.order.insert(new_index, moved);
            self.notifier.emit(&ChangeEvent::Changed {
                id,
                aspect: LayerAspect::Order,
            });
        }

        Ok(())
    }

    /// Show or hide a layer.
    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> Result<(), StoreError> {
        let layer = self.layers.get_mut(id).ok_or(StoreError::NotFound(id))?;
        if layer.visible == visible {
            return Ok(());
        }
        layer.visible = visible;
        self.notifier.emit(&ChangeEvent::Changed {
            id,
            aspect: LayerAspect::Visibility,
        });
        Ok(())
    }

    /// Select or deselect a layer.
    ///
    /// Writing the current value emits nothing, so views pushing selection
    /// into the store and re-rendering from its events cannot recurse.
    pub fn set_selected(&mut self, id: LayerId, selected: bool) -> Result<(), StoreError> {
        let layer = self.layers.get_mut(id).ok_or(StoreError::NotFound(id))?;
        if layer.selected == selected {
            return Ok(());
        }
        layer.selected = selected;
        self.notifier.emit(&ChangeEvent::Changed {
            id,
            aspect: LayerAspect::Selection,
        });

        let current = self.selected();
        self.notifier.emit(&ChangeEvent::SelectionChanged { selected: current });
        Ok(())
    }

    /// Change a layer's display name.
    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> Result<(), StoreError> {
        let layer = self.layers.get_mut(id).ok_or(StoreError::NotFound(id))?;
        let name = name.into();
        if layer.name == name {
            return Ok(());
        }
        layer.name = name;
        self.notifier.emit(&ChangeEvent::Changed {
            id,
            aspect: LayerAspect::Name,
        });
        Ok(())
    }

    /// Move a layer's content in document space.
    pub fn set_offset(&mut self, id: LayerId, offset: Point) -> Result<(), StoreError> {
        let layer = self.layers.get_mut(id).ok_or(StoreError::NotFound(id))?;
        if layer.offset == offset {
            return Ok(());
        }
        layer.offset = offset;
        self.notifier.emit(&ChangeEvent::Changed {
            id,
            aspect: LayerAspect::Offset,
        });
        Ok(())
    }

    /// Replace a layer's content in place.
    pub fn set_content(&mut self, id: LayerId, content: LayerContent) -> Result<(), StoreError> {
        let layer = self.layers.get_mut(id).ok_or(StoreError::NotFound(id))?;
        layer.content = content;
        self.notifier.emit(&ChangeEvent::Changed {
            id,
            aspect: LayerAspect::Content,
        });
        Ok(())
    }

    /// Read access to a layer.
    pub fn get(&self, id: LayerId) -> Result<&Layer, StoreError> {
        self.layers.get(id).ok_or(StoreError::NotFound(id))
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.contains_key(id)
    }

    /// Paint-order position of a layer.
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.order.iter().position(|&ordered| ordered == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Layers in paint order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &Layer)> + '_ {
        self.order.iter().map(move |&id| (id, &self.layers[id]))
    }

    /// Visible layers in paint order, ready to hand to the compositor.
    /// Restartable: every call yields a fresh pass over the store.
    pub fn iter_visible(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.order
            .iter()
            .map(move |&id| &self.layers[id])
            .filter(|layer| layer.visible)
    }

    /// Handles in paint order.
    pub fn handles(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.order.iter().copied()
    }

    /// Currently selected handles, in paint order.
    pub fn selected(&self) -> SmallVec<[LayerId; 4]> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.layers[id].selected)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::RasterContent;
    use common::color::Color;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn raster_layer(name: &str) -> Layer {
        Layer::raster(name, RasterContent::solid(4, 4, Color::RED))
    }

    #[test]
    fn test_append_order_is_iteration_order() {
        let mut store = LayerStore::new();
        let a = store.append(raster_layer("a"));
        let b = store.append(raster_layer("b"));
        let c = store.append(raster_layer("c"));

        let order: Vec<LayerId> = store.handles().collect();
        assert_eq!(order, vec![a, b, c]);

        let names: Vec<&str> = store.iter().map(|(_, layer)| layer.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_then_get_fails() {
        let mut store = LayerStore::new();
        let id = store.append(raster_layer("a"));

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(store.get(id).unwrap_err(), StoreError::NotFound(id));
        assert_eq!(store.remove(id).unwrap_err(), StoreError::NotFound(id));
    }

    #[test]
    fn test_removed_layer_not_iterated() {
        let mut store = LayerStore::new();
        let a = store.append(raster_layer("a"));
        store.append(raster_layer("b"));

        store.remove(a).unwrap();
        let names: Vec<&str> = store
            .iter_visible()
            .map(|layer| layer.name.as_str())
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_move_out_of_range_leaves_store_unchanged() {
        let mut store = LayerStore::new();
        let a = store.append(raster_layer("a"));
        let b = store.append(raster_layer("b"));

        let err = store.move_layer(a, 2).unwrap_err();
        assert_eq!(err, StoreError::OutOfRange { index: 2, len: 2 });
        assert_eq!(store.handles().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_move_reorders_paint_order() {
        let mut store = LayerStore::new();
        let a = store.append(raster_layer("a"));
        let b = store.append(raster_layer("b"));
        let c = store.append(raster_layer("c"));

        store.move_layer(c, 0).unwrap();
        assert_eq!(store.handles().collect::<Vec<_>>(), vec![c, a, b]);

        store.move_layer(c, 1).unwrap();
        assert_eq!(store.handles().collect::<Vec<_>>(), vec![a, c, b]);
    }

    #[test]
    fn test_insert_at_len_is_append() {
        let mut store = LayerStore::new();
        let a = store.append(raster_layer("a"));
        let b = store.insert(1, raster_layer("b")).unwrap();
        let bottom = store.insert(0, raster_layer("bottom")).unwrap();

        assert_eq!(store.handles().collect::<Vec<_>>(), vec![bottom, a, b]);

        let err = store.insert(5, raster_layer("x")).unwrap_err();
        assert_eq!(err, StoreError::OutOfRange { index: 5, len: 3 });
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_iter_visible_excludes_hidden() {
        let mut store = LayerStore::new();
        store.append(raster_layer("a"));
        let b = store.append(raster_layer("b"));

        store.set_visible(b, false).unwrap();
        let names: Vec<&str> = store
            .iter_visible()
            .map(|layer| layer.name.as_str())
            .collect();
        assert_eq!(names, vec!["a"]);

        store.set_visible(b, true).unwrap();
        assert_eq!(store.iter_visible().count(), 2);
    }

    #[test]
    fn test_append_emits_two_phase_events() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = LayerStore::new();

        let sink = Rc::clone(&log);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let id = store.append(raster_layer("a"));
        assert_eq!(
            *log.borrow(),
            vec![
                ChangeEvent::AboutToInsert { index: 0 },
                ChangeEvent::Inserted { id },
            ]
        );
    }

    #[test]
    fn test_remove_emits_two_phase_events() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = LayerStore::new();
        store.append(raster_layer("a"));
        let b = store.append(raster_layer("b"));

        let sink = Rc::clone(&log);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store.remove(b).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                ChangeEvent::AboutToRemove { index: 1 },
                ChangeEvent::Removed { id: b },
            ]
        );
    }

    #[test]
    fn test_setters_emit_changed_with_aspect() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = LayerStore::new();
        let id = store.append(raster_layer("a"));

        let sink = Rc::clone(&log);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store.set_visible(id, false).unwrap();
        store.rename(id, "background").unwrap();
        store.set_offset(id, Point::new(3.0, 4.0)).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                ChangeEvent::Changed {
                    id,
                    aspect: LayerAspect::Visibility
                },
                ChangeEvent::Changed {
                    id,
                    aspect: LayerAspect::Name
                },
                ChangeEvent::Changed {
                    id,
                    aspect: LayerAspect::Offset
                },
            ]
        );
    }

    #[test]
    fn test_setters_are_change_detecting() {
        let count = Rc::new(RefCell::new(0));
        let mut store = LayerStore::new();
        let id = store.append(raster_layer("a"));

        let counter = Rc::clone(&count);
        store.subscribe(move |_| *counter.borrow_mut() += 1);

        // Same values as the layer already carries: nothing may fire.
        store.set_visible(id, true).unwrap();
        store.set_selected(id, false).unwrap();
        store.rename(id, "a").unwrap();
        store.set_offset(id, Point::ZERO).unwrap();

        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_selection_changed_carries_selected_set() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = LayerStore::new();
        let a = store.append(raster_layer("a"));
        let b = store.append(raster_layer("b"));

        let sink = Rc::clone(&log);
        store.subscribe(move |event| {
            if let ChangeEvent::SelectionChanged { selected } = event {
                sink.borrow_mut().push(selected.to_vec());
            }
        });

        store.set_selected(a, true).unwrap();
        store.set_selected(b, true).unwrap();
        store.set_selected(a, false).unwrap();

        assert_eq!(*log.borrow(), vec![vec![a], vec![a, b], vec![b]]);
    }

    #[test]
    fn test_removing_selected_layer_updates_selection() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = LayerStore::new();
        let a = store.append(raster_layer("a"));
        store.set_selected(a, true).unwrap();

        let sink = Rc::clone(&log);
        store.subscribe(move |event| {
            if let ChangeEvent::SelectionChanged { selected } = event {
                sink.borrow_mut().push(selected.to_vec());
            }
        });

        store.remove(a).unwrap();
        assert_eq!(*log.borrow(), vec![Vec::<LayerId>::new()]);
    }

    #[test]
    fn test_set_content_replaces_in_place() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = LayerStore::new();
        let id = store.append(raster_layer("a"));

        let sink = Rc::clone(&log);
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let replacement = RasterContent::solid(8, 2, Color::BLUE);
        store
            .set_content(id, LayerContent::Raster(replacement))
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec![ChangeEvent::Changed {
                id,
                aspect: LayerAspect::Content
            }]
        );
        assert_eq!(
            store.get(id).unwrap().bounding_rect(),
            common::geometry::Rect::new(0.0, 0.0, 8.0, 2.0)
        );
    }

    #[test]
    fn test_stale_handle_errors() {
        let mut store = LayerStore::new();
        let id = store.append(raster_layer("a"));
        store.remove(id).unwrap();

        assert_eq!(store.set_visible(id, false), Err(StoreError::NotFound(id)));
        assert_eq!(store.set_selected(id, true), Err(StoreError::NotFound(id)));
        assert_eq!(store.rename(id, "x"), Err(StoreError::NotFound(id)));
        assert_eq!(
            store.set_offset(id, Point::new(1.0, 1.0)),
            Err(StoreError::NotFound(id))
        );
        assert_eq!(store.move_layer(id, 0), Err(StoreError::NotFound(id)));
    }
}
