use std::collections::HashMap;

use crate::gpu::ProgramHandle;
use crate::pool::{PoolHandle, ResourcePool};
use crate::renderer::entries::MeshMaterialItem;

const ITEM_POOL_PREALLOC: usize = 256;

/// Item list for one resolved program. Entries persist for the renderer's
/// lifetime; only their contents are cleared.
#[derive(Default)]
pub struct MaterialBatchEntry {
    items: Vec<PoolHandle<MeshMaterialItem>>,
}

impl MaterialBatchEntry {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Groups the frame's mesh layers by resolved shader program.
///
/// An entry is created exactly once per distinct program handle and never
/// removed; a light change or material edit invalidates every entry's
/// contents at once, because one light can change every material's program
/// variant. Items come from a dedicated pool and go back wholesale when the
/// frame drains.
pub struct MaterialBatcher {
    entries: HashMap<ProgramHandle, MaterialBatchEntry>,
    item_pool: ResourcePool<MeshMaterialItem>,
}

impl Default for MaterialBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialBatcher {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            item_pool: ResourcePool::new(|| MeshMaterialItem {
                mesh_id: 0,
                geometry: crate::gpu::GeometryHandle::dangling(),
                material: 0,
                model_matrix: glam::Mat4::IDENTITY,
                normal_matrix: glam::Mat4::IDENTITY,
                kind: crate::renderer::entries::BatchedKind::Regular,
            })
            .preallocate(ITEM_POOL_PREALLOC),
        }
    }

    /// Appends a mesh layer to the batch for `program`, creating the batch
    /// entry on first sight of the handle.
    pub fn push_item(&mut self, program: ProgramHandle, item: MeshMaterialItem) {
        let entry = self.entries.entry(program).or_insert_with(|| {
            log::debug!("new material batch for program {:?}", program);
            MaterialBatchEntry::default()
        });
        let handle = self.item_pool.acquire();
        *self.item_pool.get_mut(handle) = item;
        entry.items.push(handle);
    }

    /// Clears every entry's item list without removing the entries. Fired
    /// on light add/remove and material invalidation; next frame's visits
    /// repopulate lazily.
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.items.clear();
        }
        self.item_pool.return_all();
    }

    /// End-of-frame drain: pops every item list and returns the blocks to
    /// the item pool in one sweep.
    pub fn drain(&mut self) -> usize {
        let drained = self.item_count();
        for entry in self.entries.values_mut() {
            entry.items.clear();
        }
        self.item_pool.return_all();
        drained
    }

    /// Batches with their items resolved, in map order.
    pub fn batches(&self) -> impl Iterator<Item = (ProgramHandle, Vec<&MeshMaterialItem>)> + '_ {
        self.entries.iter().map(move |(program, entry)| {
            let items = entry
                .items
                .iter()
                .map(|handle| self.item_pool.get(*handle))
                .collect();
            (*program, items)
        })
    }

    pub fn items_of(&self, program: ProgramHandle) -> Vec<&MeshMaterialItem> {
        self.entries
            .get(&program)
            .map(|entry| {
                entry
                    .items
                    .iter()
                    .map(|handle| self.item_pool.get(*handle))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn item_count(&self) -> usize {
        self.entries.values().map(|entry| entry.items.len()).sum()
    }

    /// Item lengths per entry, for invalidation checks.
    pub fn entry_lens(&self) -> Vec<usize> {
        self.entries.values().map(|entry| entry.items.len()).collect()
    }

    pub fn pool_constructed(&self) -> usize {
        self.item_pool.constructed()
    }
}
