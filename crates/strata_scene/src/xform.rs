//! Transform Store
//!
//! A growable struct-of-arrays table holding, per slot:
//!
//! - **Local components** set by callers: position, rotation, scale
//! - **Cached matrices**: the local matrix (recomputed lazily from the
//!   components) and the world matrix (written by the hierarchy graph, or
//!   directly by callers for unparented objects)
//! - **Liveness**: the identifier of the handle lineage owning the slot
//!
//! Slots are addressed exclusively through [`Handle`]s. Every accessor checks
//! the handle's identifier against the slot's, so a handle kept past
//! [`TransformStore::destroy`] is rejected even after the slot has been reused.
//! Slot indices never move; growth only extends the arrays, so handles issued
//! before a growth stay valid after it.
//!
//! Invalid handles are never fatal. Getters log a warning and return the
//! identity value, setters log a warning and do nothing.

use glam::{Mat4, Quat, Vec3};
use log::{debug, warn};
use strata_core::config::SLOT_ALIGNMENT;
use strata_core::{Handle, Identifier, IdentifierSource, Result, StoreConfig, StrataError};

use crate::dirty::DirtyList;

/// Number of whitespace-separated fields in the string form of a transform:
/// position (3), rotation quaternion xyzw (4), scale (3).
pub const TRANSFORM_STRING_FIELDS: usize = 10;

/// Builds a local matrix from its components.
///
/// Scale is applied first, then rotation, then translation. The order is
/// fixed; changing it changes every composed world matrix.
#[inline]
#[must_use]
pub fn compose_local(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

/// Struct-of-arrays storage for transforms.
#[derive(Debug)]
pub struct TransformStore {
    // -- Local components (set by callers) --
    position: Vec<Vec3>,
    rotation: Vec<Quat>,
    scale: Vec<Vec3>,

    // -- Cached matrices --
    local: Vec<Mat4>,
    world: Vec<Mat4>,

    // -- Allocation --
    identifier: Vec<Identifier>,
    /// Set while a hierarchy node drives the slot's world matrix.
    attached: Vec<bool>,
    free_list: Vec<u32>,
    capacity: u32,
    live: u32,
    ids: IdentifierSource,

    // -- Dirty tracking --
    dirty: DirtyList,
    /// Attached slots whose local matrix was recomputed since the hierarchy
    /// graph last drained this list.
    moved: DirtyList,
}

impl Default for TransformStore {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::wrong_self_convention)]
impl TransformStore {
    /// Creates a store with the default configuration and its own identifier
    /// source.
    #[must_use]
    pub fn new() -> Self {
        Self::build(StoreConfig::default(), IdentifierSource::new())
    }

    /// Creates a store with `config`.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        Self::with_identifiers(config, IdentifierSource::new())
    }

    /// Creates a store drawing identifiers from `ids`.
    ///
    /// Pass a clone of the source used by the hierarchy graph so that node and
    /// transform handles can never be confused for one another.
    pub fn with_identifiers(config: StoreConfig, ids: IdentifierSource) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, ids))
    }

    fn build(config: StoreConfig, ids: IdentifierSource) -> Self {
        let mut store = Self {
            position: Vec::new(),
            rotation: Vec::new(),
            scale: Vec::new(),
            local: Vec::new(),
            world: Vec::new(),
            identifier: Vec::new(),
            attached: Vec::new(),
            free_list: Vec::new(),
            capacity: 0,
            live: 0,
            ids,
            dirty: DirtyList::new(),
            moved: DirtyList::new(),
        };
        store.grow_to(config.initial_slot_count);
        store
    }

    // -- Allocation API --

    /// Allocates a transform at the origin with identity rotation and unit
    /// scale.
    ///
    /// Identity components need no recompute, so the slot is not marked dirty.
    pub fn create(&mut self) -> Handle {
        self.allocate()
    }

    /// Allocates a transform at `position`. Marks it dirty.
    pub fn from_position(&mut self, position: Vec3) -> Handle {
        self.from_position_rotation_scale(position, Quat::IDENTITY, Vec3::ONE)
    }

    /// Allocates a transform with `rotation`. Marks it dirty.
    pub fn from_rotation(&mut self, rotation: Quat) -> Handle {
        self.from_position_rotation_scale(Vec3::ZERO, rotation, Vec3::ONE)
    }

    /// Allocates a transform at `position` with `rotation`. Marks it dirty.
    pub fn from_position_rotation(&mut self, position: Vec3, rotation: Quat) -> Handle {
        self.from_position_rotation_scale(position, rotation, Vec3::ONE)
    }

    /// Allocates a transform from all three components. Marks it dirty.
    pub fn from_position_rotation_scale(
        &mut self,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Handle {
        let handle = self.allocate();
        let i = handle.slot_index() as usize;
        self.position[i] = position;
        self.rotation[i] = rotation;
        self.scale[i] = scale;
        self.dirty.push(handle.slot_index());
        handle
    }

    /// Frees the slot behind `handle` and invalidates `handle` in place.
    ///
    /// Invalid or stale handles are left untouched.
    pub fn destroy(&mut self, handle: &mut Handle) {
        let Some(i) = self.resolve(*handle) else {
            return;
        };
        let slot = i as u32;
        self.identifier[i] = Identifier::INVALID;
        self.attached[i] = false;
        self.dirty.remove(slot);
        self.moved.remove(slot);
        self.free_list.push(slot);
        self.live -= 1;
        handle.invalidate();
    }

    /// Returns whether `handle` refers to a live slot of this store.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.resolve(handle).is_some()
    }

    /// Number of live transforms.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of allocated slots, live or free.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Iterates over handles of all live transforms in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        self.identifier
            .iter()
            .enumerate()
            .filter(|(_, id)| !id.is_invalid())
            .map(|(i, &id)| Handle::new(i as u32, id))
    }

    // -- Component getters --

    #[must_use]
    pub fn position_get(&self, handle: Handle) -> Vec3 {
        self.resolve_or_warn(handle, "position_get")
            .map_or(Vec3::ZERO, |i| self.position[i])
    }

    #[must_use]
    pub fn rotation_get(&self, handle: Handle) -> Quat {
        self.resolve_or_warn(handle, "rotation_get")
            .map_or(Quat::IDENTITY, |i| self.rotation[i])
    }

    #[must_use]
    pub fn scale_get(&self, handle: Handle) -> Vec3 {
        self.resolve_or_warn(handle, "scale_get")
            .map_or(Vec3::ONE, |i| self.scale[i])
    }

    /// Returns the cached local matrix.
    ///
    /// Stale while the slot is dirty; see [`calculate_local`](Self::calculate_local).
    #[must_use]
    pub fn local_get(&self, handle: Handle) -> Mat4 {
        self.resolve_or_warn(handle, "local_get")
            .map_or(Mat4::IDENTITY, |i| self.local[i])
    }

    /// Returns the cached world matrix.
    ///
    /// For transforms attached to a hierarchy graph this is only current after
    /// the graph's update for the frame has run.
    #[must_use]
    pub fn world_get(&self, handle: Handle) -> Mat4 {
        self.resolve_or_warn(handle, "world_get")
            .map_or(Mat4::IDENTITY, |i| self.world[i])
    }

    // -- Component setters (mark dirty) --

    pub fn position_set(&mut self, handle: Handle, position: Vec3) {
        self.modify(handle, "position_set", |p, _, _| *p = position);
    }

    pub fn rotation_set(&mut self, handle: Handle, rotation: Quat) {
        self.modify(handle, "rotation_set", |_, r, _| *r = rotation);
    }

    pub fn scale_set(&mut self, handle: Handle, scale: Vec3) {
        self.modify(handle, "scale_set", |_, _, s| *s = scale);
    }

    pub fn position_rotation_set(&mut self, handle: Handle, position: Vec3, rotation: Quat) {
        self.modify(handle, "position_rotation_set", |p, r, _| {
            *p = position;
            *r = rotation;
        });
    }

    pub fn position_rotation_scale_set(
        &mut self,
        handle: Handle,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) {
        self.modify(handle, "position_rotation_scale_set", |p, r, s| {
            *p = position;
            *r = rotation;
            *s = scale;
        });
    }

    /// Offsets the position by `delta`.
    pub fn translate(&mut self, handle: Handle, delta: Vec3) {
        self.modify(handle, "translate", |p, _, _| *p += delta);
    }

    /// Applies `delta` on top of the current rotation (in parent space).
    pub fn rotate(&mut self, handle: Handle, delta: Quat) {
        self.modify(handle, "rotate", |_, r, _| *r = (delta * *r).normalize());
    }

    /// Multiplies the scale component-wise by `factor`.
    pub fn scale_by(&mut self, handle: Handle, factor: Vec3) {
        self.modify(handle, "scale_by", |_, _, s| *s *= factor);
    }

    /// [`translate`](Self::translate) and [`rotate`](Self::rotate) in one
    /// validation.
    pub fn translate_rotate(&mut self, handle: Handle, delta_position: Vec3, delta_rotation: Quat) {
        self.modify(handle, "translate_rotate", |p, r, _| {
            *p += delta_position;
            *r = (delta_rotation * *r).normalize();
        });
    }

    // -- Matrices --

    /// Recomputes the local matrix of one transform and drops it from the
    /// dirty list.
    pub fn calculate_local(&mut self, handle: Handle) {
        let Some(i) = self.resolve_or_warn(handle, "calculate_local") else {
            return;
        };
        self.local[i] = compose_local(self.position[i], self.rotation[i], self.scale[i]);
        self.dirty.remove(i as u32);
        if self.attached[i] {
            self.moved.push(i as u32);
        }
    }

    /// Recomputes every dirty local matrix and empties the dirty list.
    /// Returns how many were recomputed.
    pub fn calculate_dirty(&mut self) -> usize {
        let count = self.dirty.len();
        for slot in self.dirty.drain() {
            let i = slot as usize;
            self.local[i] = compose_local(self.position[i], self.rotation[i], self.scale[i]);
            if self.attached[i] {
                self.moved.push(slot);
            }
        }
        count
    }

    /// Writes the world matrix of an unparented transform.
    ///
    /// Refused with a warning when a hierarchy node drives the transform.
    pub fn world_set(&mut self, handle: Handle, world: Mat4) {
        let Some(i) = self.resolve_or_warn(handle, "world_set") else {
            return;
        };
        if self.attached[i] {
            warn!("TransformStore::world_set: {handle} is driven by a hierarchy node, ignoring");
            return;
        }
        self.world[i] = world;
    }

    /// Whether a hierarchy node currently drives this transform.
    #[must_use]
    pub fn is_attached(&self, handle: Handle) -> bool {
        self.resolve(handle).is_some_and(|i| self.attached[i])
    }

    /// Whether the transform is waiting for a local-matrix recompute.
    #[must_use]
    pub fn is_dirty(&self, handle: Handle) -> bool {
        self.resolve(handle)
            .is_some_and(|i| self.dirty.contains(i as u32))
    }

    /// Number of transforms waiting for a local-matrix recompute.
    #[inline]
    #[must_use]
    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    /// World matrices of every slot, indexed by slot index.
    ///
    /// Free slots hold whatever their last owner left behind; pair with
    /// [`iter`](Self::iter) to select live ones.
    #[inline]
    #[must_use]
    pub fn world_matrices(&self) -> &[Mat4] {
        &self.world
    }

    /// [`world_matrices`](Self::world_matrices) as raw bytes, ready for a GPU
    /// buffer upload.
    #[inline]
    #[must_use]
    pub fn world_matrix_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.world)
    }

    // -- Text form --

    /// Serializes position, rotation (xyzw) and scale as ten
    /// whitespace-separated floats.
    ///
    /// Returns an empty string for an invalid handle.
    #[must_use]
    pub fn to_string(&self, handle: Handle) -> String {
        let Some(i) = self.resolve_or_warn(handle, "to_string") else {
            return String::new();
        };
        let p = self.position[i];
        let r = self.rotation[i];
        let s = self.scale[i];
        format!(
            "{} {} {} {} {} {} {} {} {} {}",
            p.x, p.y, p.z, r.x, r.y, r.z, r.w, s.x, s.y, s.z
        )
    }

    /// Parses the format produced by [`to_string`](Self::to_string) into
    /// position, rotation and scale.
    pub fn parse_components(text: &str) -> Result<(Vec3, Quat, Vec3)> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != TRANSFORM_STRING_FIELDS {
            return Err(StrataError::ComponentCount {
                expected: TRANSFORM_STRING_FIELDS,
                found: fields.len(),
            });
        }

        let mut values = [0.0_f32; TRANSFORM_STRING_FIELDS];
        for (index, (value, field)) in values.iter_mut().zip(&fields).enumerate() {
            *value = field.parse::<f32>().map_err(|e| StrataError::Parse {
                index,
                input: (*field).to_string(),
                reason: e.to_string(),
            })?;
            if !value.is_finite() {
                return Err(StrataError::Parse {
                    index,
                    input: (*field).to_string(),
                    reason: "value is not finite".to_string(),
                });
            }
        }

        let position = Vec3::new(values[0], values[1], values[2]);
        let mut rotation = Quat::from_xyzw(values[3], values[4], values[5], values[6]);
        let length = rotation.length();
        if !length.is_finite() || length <= f32::EPSILON {
            return Err(StrataError::Parse {
                index: 3,
                input: fields[3..7].join(" "),
                reason: format!("rotation quaternion of length {length} cannot be normalized"),
            });
        }
        if !rotation.is_normalized() {
            debug!("TransformStore::parse_components: normalizing rotation {rotation:?}");
            rotation = rotation.normalize();
        }
        let scale = Vec3::new(values[7], values[8], values[9]);
        Ok((position, rotation, scale))
    }

    /// Allocates a transform from the output of [`to_string`](Self::to_string).
    pub fn from_string(&mut self, text: &str) -> Result<Handle> {
        let (position, rotation, scale) = Self::parse_components(text)?;
        Ok(self.from_position_rotation_scale(position, rotation, scale))
    }

    // -- Raw-slot access for the hierarchy graph --
    //
    // These take slot indices the graph obtained from handles it validated
    // earlier in the same call.

    #[inline]
    pub(crate) fn local_at(&self, slot: u32) -> Mat4 {
        self.local[slot as usize]
    }

    #[inline]
    pub(crate) fn world_at(&self, slot: u32) -> Mat4 {
        self.world[slot as usize]
    }

    #[inline]
    pub(crate) fn world_write(&mut self, slot: u32, world: Mat4) {
        self.world[slot as usize] = world;
    }

    #[inline]
    pub(crate) fn set_attached(&mut self, slot: u32, attached: bool) {
        self.attached[slot as usize] = attached;
    }

    /// Empties the list of attached slots whose local matrix changed.
    pub(crate) fn drain_moved(&mut self) -> std::vec::Drain<'_, u32> {
        self.moved.drain()
    }

    // -- Internal helpers --

    /// The validation check shared by every accessor.
    #[inline]
    fn resolve(&self, handle: Handle) -> Option<usize> {
        let slot = handle.slot_index();
        if slot >= self.capacity || handle.identifier().is_invalid() {
            return None;
        }
        let i = slot as usize;
        (self.identifier[i] == handle.identifier()).then_some(i)
    }

    fn resolve_or_warn(&self, handle: Handle, op: &str) -> Option<usize> {
        let resolved = self.resolve(handle);
        if resolved.is_none() {
            warn!("TransformStore::{op}: invalid or stale handle {handle}");
        }
        resolved
    }

    fn modify(
        &mut self,
        handle: Handle,
        op: &str,
        apply: impl FnOnce(&mut Vec3, &mut Quat, &mut Vec3),
    ) {
        let Some(i) = self.resolve_or_warn(handle, op) else {
            return;
        };
        apply(&mut self.position[i], &mut self.rotation[i], &mut self.scale[i]);
        self.dirty.push(i as u32);
    }

    fn allocate(&mut self) -> Handle {
        if self.free_list.is_empty() {
            let doubled = self.capacity.max(SLOT_ALIGNMENT / 2) * 2;
            self.grow_to(doubled);
        }
        let Some(slot) = self.free_list.pop() else {
            unreachable!("free list empty after growth");
        };
        let i = slot as usize;
        self.position[i] = Vec3::ZERO;
        self.rotation[i] = Quat::IDENTITY;
        self.scale[i] = Vec3::ONE;
        self.local[i] = Mat4::IDENTITY;
        self.world[i] = Mat4::IDENTITY;
        self.attached[i] = false;

        let handle = self.ids.handle(slot);
        self.identifier[i] = handle.identifier();
        self.live += 1;
        handle
    }

    /// Extends every array to `new_capacity` slots and queues the new slots
    /// on the free list, lowest index on top.
    fn grow_to(&mut self, new_capacity: u32) {
        assert!(
            new_capacity > self.capacity && new_capacity < strata_core::INVALID_INDEX,
            "transform store capacity overflow ({} -> {new_capacity})",
            self.capacity
        );
        let old = self.capacity;
        let n = new_capacity as usize;

        self.position.resize(n, Vec3::ZERO);
        self.rotation.resize(n, Quat::IDENTITY);
        self.scale.resize(n, Vec3::ONE);
        self.local.resize(n, Mat4::IDENTITY);
        self.world.resize(n, Mat4::IDENTITY);
        self.identifier.resize(n, Identifier::INVALID);
        self.attached.resize(n, false);

        self.free_list.extend((old..new_capacity).rev());
        self.capacity = new_capacity;

        if old > 0 {
            debug!("TransformStore grew from {old} to {new_capacity} slots");
        }
    }
}
