use std::ops::Range;

use bitfield_struct::bitfield;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::SGError;
use crate::serialization::SerializationFormat;

/// Deepest level a grid point may reach in any dimension.
pub const MAX_LEVEL: u8 = 30;

/// Version written into serialized storages.
pub const STORAGE_VERSION: u32 = 1;

///
/// One hierarchical hat function along a single axis.
///
/// Inner keys have `level >= 1` and an odd `index` in `1..2^level`. Boundary grids
/// additionally use level zero, where index 0 is the left (`1 - x`) and index 1 the
/// right (`x`) boundary function.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelIndex
{
    pub level: u8,
    pub index: u32,
}

impl LevelIndex
{
    #[inline]
    pub const fn new(level: u8, index: u32) -> Self
    {
        Self { level, index }
    }

    #[inline]
    pub const fn level_one() -> Self
    {
        Self::new(1, 1)
    }

    #[inline]
    pub const fn left_boundary() -> Self
    {
        Self::new(0, 0)
    }

    #[inline]
    pub const fn right_boundary() -> Self
    {
        Self::new(0, 1)
    }

    #[inline]
    pub fn is_boundary(&self) -> bool
    {
        self.level == 0
    }

    pub fn is_valid(&self, has_boundary: bool) -> bool
    {
        if self.level == 0
        {
            has_boundary && self.index <= 1
        }
        else
        {
            self.level <= MAX_LEVEL && self.index % 2 == 1 && self.index < (1 << self.level)
        }
    }

    #[inline]
    pub fn left_child(&self) -> Self
    {
        self.assert_refinable();
        Self::new(self.level + 1, 2 * self.index - 1)
    }

    #[inline]
    pub fn right_child(&self) -> Self
    {
        self.assert_refinable();
        Self::new(self.level + 1, 2 * self.index + 1)
    }

    fn assert_refinable(&self)
    {
        assert!(self.level > 0, "level-zero keys have the single child (1, 1)");
        assert!(self.level < MAX_LEVEL, "cannot refine beyond level {MAX_LEVEL}");
    }

    ///
    /// Hierarchical parent. Panics for level <= 1: an inner root has no parent and the
    /// parents of a level-one key in a boundary grid are the two level-zero keys.
    ///
    pub fn parent(&self) -> Self
    {
        match self.try_parent()
        {
            Some(parent) => parent,
            None => panic!("({}, {}) has no hierarchical parent", self.level, self.index),
        }
    }

    #[inline]
    pub fn try_parent(&self) -> Option<Self>
    {
        if self.level <= 1
        {
            None
        }
        else
        {
            Some(Self::new(self.level - 1, (self.index >> 1) | 1))
        }
    }

    ///
    /// True if the support of `self` ends at or before the midpoint of `other`.
    ///
    #[inline]
    pub fn is_left_of(&self, other: &LevelIndex) -> bool
    {
        ((self.index as u64 + 1) << other.level) <= ((other.index as u64) << self.level)
    }

    ///
    /// True if the support of `self` starts at or after the midpoint of `other`.
    ///
    #[inline]
    pub fn is_right_of(&self, other: &LevelIndex) -> bool
    {
        ((self.index as u64).saturating_sub(1) << other.level) >= ((other.index as u64) << self.level)
    }

    ///
    /// True if `other` lies in the subtree rooted at `self`.
    ///
    pub fn is_ancestor_of(&self, other: &LevelIndex) -> bool
    {
        if self.level >= other.level
        {
            return false;
        }
        if self.level == 0
        {
            return true;
        }
        !self.is_left_of(other) && !self.is_right_of(other)
    }

    #[inline]
    pub fn coordinate(&self) -> f64
    {
        self.index as f64 / (1_u64 << self.level) as f64
    }

    #[inline]
    pub fn mesh_width(&self) -> f64
    {
        1.0 / (1_u64 << self.level) as f64
    }
}

#[bitfield(u8, new=false)]
#[derive(PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    pub _empty: u8
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }
}

///
/// A d-dimensional grid point, one [`LevelIndex`] per dimension. Dimension order is significant.
///
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
}

impl PartialOrd for GridPoint
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering>
    {
        Some(std::cmp::Ord::cmp(self, other))
    }
}

impl Ord for GridPoint
{
    fn cmp(&self, other: &Self) -> std::cmp::Ordering
    {
        self.index.cmp(&other.index).then(self.level.cmp(&other.level))
    }
}

impl GridPoint
{
    pub fn new(level: &[u8], index: &[u32]) -> Self
    {
        assert_eq!(level.len(), index.len(), "level and index must have the same dimension");
        Self { level: level.to_vec(), index: index.to_vec() }
    }

    pub fn from_keys(keys: &[LevelIndex]) -> Self
    {
        Self { level: keys.iter().map(|k| k.level).collect(), index: keys.iter().map(|k| k.index).collect() }
    }

    ///
    /// The level-one point, root of every inner grid.
    ///
    pub fn root(num_inputs: usize) -> Self
    {
        Self { level: vec![1; num_inputs], index: vec![1; num_inputs] }
    }

    ///
    /// The all-left-boundary point, where boundary sweeps start.
    ///
    pub fn zero_index(num_inputs: usize) -> Self
    {
        Self { level: vec![0; num_inputs], index: vec![0; num_inputs] }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.level.len()
    }

    #[inline]
    pub fn get(&self, dim: usize) -> LevelIndex
    {
        LevelIndex::new(self.level[dim], self.index[dim])
    }

    #[inline]
    pub fn set(&mut self, dim: usize, key: LevelIndex)
    {
        self.level[dim] = key.level;
        self.index[dim] = key.index;
    }

    ///
    /// Copy of `self` with dimension `dim` replaced by `key`.
    ///
    #[inline]
    pub fn with(&self, dim: usize, key: LevelIndex) -> Self
    {
        let mut r = self.clone();
        r.set(dim, key);
        r
    }

    pub fn left_child(&self, dim: usize) -> GridPoint
    {
        self.with(dim, self.get(dim).left_child())
    }

    pub fn right_child(&self, dim: usize) -> GridPoint
    {
        self.with(dim, self.get(dim).right_child())
    }

    pub fn parent(&self, dim: usize) -> GridPoint
    {
        self.with(dim, self.get(dim).parent())
    }

    pub fn try_parent(&self, dim: usize) -> Option<GridPoint>
    {
        self.get(dim).try_parent().map(|key| self.with(dim, key))
    }

    ///
    /// Direct descendants along `dim`. Level-zero keys have the single child (1, 1);
    /// keys at [`MAX_LEVEL`] have none.
    ///
    pub fn children(&self, dim: usize) -> Vec<GridPoint>
    {
        let key = self.get(dim);
        if key.level == 0
        {
            vec![self.with(dim, LevelIndex::level_one())]
        }
        else if key.level >= MAX_LEVEL
        {
            Vec::new()
        }
        else
        {
            vec![self.with(dim, key.left_child()), self.with(dim, key.right_child())]
        }
    }

    ///
    /// Direct ancestors along `dim`. Level-one keys descend from both boundary keys,
    /// but only in boundary grids.
    ///
    pub fn parents(&self, dim: usize, has_boundary: bool) -> Vec<GridPoint>
    {
        let key = self.get(dim);
        match key.level
        {
            0 => Vec::new(),
            1 if has_boundary => vec![self.with(dim, LevelIndex::left_boundary()), self.with(dim, LevelIndex::right_boundary())],
            1 => Vec::new(),
            _ => vec![self.with(dim, key.parent())],
        }
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }

    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }

    pub fn level_min(&self) -> u8
    {
        *self.level.iter().min().unwrap_or(&0)
    }

    ///
    /// This is an inner point if no levels are zero...
    ///
    pub fn is_inner_point(&self) -> bool
    {
        !self.level.contains(&0)
    }

    pub fn is_root(&self) -> bool
    {
        self.level.iter().all(|&l| l == 1)
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        (0..self.num_inputs()).map(|d| self.get(d).coordinate()).collect()
    }
}

pub struct GridPointRef<'a>
{
    pub level: &'a [u8],
    pub index: &'a [u32],
    pub flags: GridPointFlags,
}

impl GridPointRef<'_>
{
    #[inline]
    pub fn get(&self, dim: usize) -> LevelIndex
    {
        LevelIndex::new(self.level[dim], self.index[dim])
    }

    #[inline]
    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    #[inline]
    pub fn is_inner_point(&self) -> bool
    {
        self.flags.is_inner()
    }

    pub fn to_point(&self) -> GridPoint
    {
        GridPoint::new(self.level, self.index)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox
{
    pub lower: Vec<f64>,
    pub upper: Vec<f64>
}

impl BoundingBox
{
    #[inline]
    pub fn new(lower: &[f64], upper: &[f64]) -> Self
    {
        Self { lower: lower.to_vec(), upper: upper.to_vec() }
    }

    pub fn with_dim(num_inputs: usize) -> Self
    {
        Self { lower: vec![0.0; num_inputs], upper: vec![1.0; num_inputs] }
    }

    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.upper[dim] - self.lower[dim]
    }

    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(d, &x)| (x - self.lower[d]) / self.width(d)).collect()
    }

    #[inline]
    pub fn to_real_coordinate_in_place(&self, point: &mut [f64])
    {
        for (d, x) in point.iter_mut().enumerate()
        {
            *x = self.lower[d] + self.width(d) * *x;
        }
    }

    #[inline]
    pub fn contains(&self, point: &[f64]) -> bool
    {
        point.iter().enumerate().all(|(d, &x)| self.lower[d] <= x && x <= self.upper[d])
    }
}

///
/// Flattened per-point arrays in position order, the layout consumed by vectorized or
/// distributed operator backends. `parent[seq * num_inputs + dim]` is the position of the
/// level-decremented parent or `u32::MAX` if there is none.
///
#[derive(Clone, Debug, PartialEq)]
pub struct FlatGrid
{
    pub num_inputs: usize,
    pub level: Vec<u8>,
    pub index: Vec<u32>,
    pub parent: Vec<u32>,
}

///
/// Hash-indexed point store. Positions always form the dense range `0..len()`, so a
/// coefficient vector of length `len()` is indexed by position directly.
///
#[derive(Clone, Debug)]
pub struct GridStorage
{
    pub(crate) num_inputs: usize,
    pub(crate) level: Vec<u8>,
    pub(crate) index: Vec<u32>,
    pub(crate) flags: Vec<GridPointFlags>,
    pub(crate) map: FxHashMap<GridPoint, u32>,
    pub(crate) bounding_box: BoundingBox,
    pub(crate) has_boundary: bool,
}

impl GridStorage
{
    pub fn new(num_inputs: usize) -> Result<Self, SGError>
    {
        if num_inputs == 0
        {
            return Err(SGError::InvalidDimension);
        }
        Ok(Self
        {
            num_inputs,
            level: Vec::new(),
            index: Vec::new(),
            flags: Vec::new(),
            map: FxHashMap::default(),
            bounding_box: BoundingBox::with_dim(num_inputs),
            has_boundary: false,
        })
    }

    pub fn with_boundary(num_inputs: usize) -> Result<Self, SGError>
    {
        let mut storage = Self::new(num_inputs)?;
        storage.has_boundary = true;
        Ok(storage)
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.num_inputs
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.flags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.flags.is_empty()
    }

    #[inline(always)]
    pub fn has_boundary(&self) -> bool
    {
        self.has_boundary
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox
    {
        &self.bounding_box
    }

    #[inline]
    pub fn bounding_box_mut(&mut self) -> &mut BoundingBox
    {
        &mut self.bounding_box
    }

    #[inline(always)]
    fn range(&self, seq: usize) -> Range<usize>
    {
        seq * self.num_inputs..(seq + 1) * self.num_inputs
    }

    #[inline]
    pub fn point(&self, seq: usize) -> GridPoint
    {
        let range = self.range(seq);
        GridPoint::new(&self.level[range.clone()], &self.index[range])
    }

    #[inline]
    pub fn point_ref(&self, seq: usize) -> GridPointRef<'_>
    {
        let range = self.range(seq);
        GridPointRef { level: &self.level[range.clone()], index: &self.index[range], flags: self.flags[seq] }
    }

    #[inline(always)]
    pub fn level(&self, seq: usize, dim: usize) -> u8
    {
        self.level[self.num_inputs * seq + dim]
    }

    #[inline]
    pub fn index(&self, seq: usize, dim: usize) -> u32
    {
        self.index[self.num_inputs * seq + dim]
    }

    #[inline]
    pub fn level_index(&self, seq: usize, dim: usize) -> LevelIndex
    {
        LevelIndex::new(self.level(seq, dim), self.index(seq, dim))
    }

    #[inline]
    pub fn is_leaf(&self, seq: usize) -> bool
    {
        self.flags[seq].is_leaf()
    }

    #[inline]
    pub fn is_inner_point(&self, seq: usize) -> bool
    {
        self.flags[seq].is_inner()
    }

    #[inline]
    pub fn index_of(&self, point: &GridPoint) -> Option<usize>
    {
        self.map.get(point).map(|&v| v as usize)
    }

    #[inline]
    pub fn contains(&self, point: &GridPoint) -> bool
    {
        self.map.contains_key(point)
    }

    pub fn has_children(&self, point: &GridPoint) -> bool
    {
        (0..self.num_inputs).any(|dim| point.children(dim).iter().any(|child| self.contains(child)))
    }

    ///
    /// Checks that `point` has the dimension of this grid and a valid key in every dimension.
    /// Level-zero keys are only valid in a grid with boundary points.
    ///
    pub fn validate(&self, point: &GridPoint) -> Result<(), SGError>
    {
        if point.num_inputs() != self.num_inputs
        {
            return Err(SGError::PointDimensionMismatch { expected: self.num_inputs, actual: point.num_inputs() });
        }
        match (0..self.num_inputs).find(|&dim| !point.get(dim).is_valid(self.has_boundary))
        {
            Some(dim) => Err(SGError::InvalidGridPoint { dim }),
            None => Ok(()),
        }
    }

    ///
    /// Inserts `point` at position `len()` and returns its position. Inserting a point that
    /// is already present returns its current position and changes nothing.
    ///
    pub fn insert(&mut self, point: GridPoint) -> Result<usize, SGError>
    {
        self.validate(&point)?;
        if let Some(seq) = self.index_of(&point)
        {
            return Ok(seq);
        }
        let is_leaf = !self.has_children(&point);
        for dim in 0..self.num_inputs
        {
            for parent in point.parents(dim, self.has_boundary)
            {
                if let Some(seq) = self.index_of(&parent)
                {
                    self.flags[seq].set_is_leaf(false);
                }
            }
        }
        Ok(self.push(point, is_leaf))
    }

    ///
    /// Appends without touching the flags of other points. Generators call
    /// [`GridStorage::recalc_leaf_property`] once they are done.
    ///
    pub(crate) fn push(&mut self, point: GridPoint, is_leaf: bool) -> usize
    {
        let seq = self.flags.len();
        self.flags.push(GridPointFlags::new(&point.level, is_leaf));
        self.level.extend_from_slice(&point.level);
        self.index.extend_from_slice(&point.index);
        self.map.insert(point, seq as u32);
        seq
    }

    ///
    /// Replaces the point stored at `seq` with `point`.
    ///
    pub(crate) fn update(&mut self, point: GridPoint, seq: usize) -> Result<(), SGError>
    {
        if seq >= self.len()
        {
            return Err(SGError::PointNotFound);
        }
        let old = self.point(seq);
        if old == point
        {
            return Ok(());
        }
        debug_assert!(!self.contains(&point), "update would duplicate an existing point");
        self.map.remove(&old);
        let range = self.range(seq);
        self.level[range.clone()].copy_from_slice(&point.level);
        self.index[range].copy_from_slice(&point.index);
        self.flags[seq].set_is_inner(point.is_inner_point());
        self.map.insert(point, seq as u32);
        Ok(())
    }

    ///
    /// Removes `point` and moves the point at the last position into the vacated one.
    /// Returns the vacated position, so a coefficient vector follows with `Vec::swap_remove`.
    /// Children of `point` are not checked.
    ///
    pub fn remove(&mut self, point: &GridPoint) -> Result<usize, SGError>
    {
        let seq = self.map.remove(point).ok_or(SGError::PointNotFound)? as usize;
        let last = self.len() - 1;
        if seq != last
        {
            let moved = self.point(last);
            let src = self.range(last);
            let dst = self.range(seq).start;
            self.level.copy_within(src.clone(), dst);
            self.index.copy_within(src, dst);
            self.flags[seq] = self.flags[last];
            self.map.insert(moved, seq as u32);
        }
        self.level.truncate(last * self.num_inputs);
        self.index.truncate(last * self.num_inputs);
        self.flags.truncate(last);

        for dim in 0..self.num_inputs
        {
            for parent in point.parents(dim, self.has_boundary)
            {
                if let Some(parent_seq) = self.index_of(&parent)
                {
                    let is_leaf = !self.has_children(&parent);
                    self.flags[parent_seq].set_is_leaf(is_leaf);
                }
            }
        }
        Ok(seq)
    }

    pub fn recalc_leaf_property(&mut self)
    {
        for seq in 0..self.len()
        {
            let is_leaf = !self.has_children(&self.point(seq));
            self.flags[seq].set_is_leaf(is_leaf);
        }
    }

    pub(crate) fn generate_map(&mut self)
    {
        let mut map = FxHashMap::default();
        map.reserve(self.len());
        for seq in 0..self.len()
        {
            map.insert(self.point(seq), seq as u32);
        }
        self.map = map;
    }

    ///
    /// Return the nodes in the grid, in position order.
    ///
    pub fn nodes(&self) -> NodeIterator<'_>
    {
        NodeIterator::new(self)
    }

    ///
    /// Return the real coordinates for each node...
    ///
    pub fn points(&self) -> PointIterator<'_>
    {
        PointIterator::new(self)
    }

    pub fn for_each<F: FnMut(usize, GridPointRef<'_>)>(&self, mut callback: F)
    {
        for (seq, node) in self.nodes().enumerate()
        {
            callback(seq, node);
        }
    }

    pub fn unit_coordinate(&self, seq: usize) -> Vec<f64>
    {
        (0..self.num_inputs).map(|d| self.level_index(seq, d).coordinate()).collect()
    }

    ///
    /// Points that `point` needs present along `dim` for the grid to stay admissible:
    /// its parent, both boundary keys for a level-one key in a boundary grid, or the
    /// opposite boundary key for a level-zero key.
    ///
    pub fn required_neighbours(&self, point: &GridPoint, dim: usize) -> Vec<GridPoint>
    {
        let key = point.get(dim);
        if key.level == 0
        {
            vec![point.with(dim, LevelIndex::new(0, 1 - key.index.min(1)))]
        }
        else
        {
            point.parents(dim, self.has_boundary)
        }
    }

    ///
    /// Verifies that every point's ancestors are present in every dimension.
    ///
    pub fn check_admissibility(&self) -> Result<(), SGError>
    {
        for seq in 0..self.len()
        {
            let point = self.point(seq);
            for dim in 0..self.num_inputs
            {
                if self.required_neighbours(&point, dim).iter().any(|p| !self.contains(p))
                {
                    return Err(SGError::MissingAncestor { seq, dim });
                }
            }
        }
        Ok(())
    }

    pub fn export_flat(&self) -> FlatGrid
    {
        let mut parent = vec![u32::MAX; self.level.len()];
        for seq in 0..self.len()
        {
            let point = self.point(seq);
            for dim in 0..self.num_inputs
            {
                if let Some(p) = point.try_parent(dim).and_then(|p| self.index_of(&p))
                {
                    parent[seq * self.num_inputs + dim] = p as u32;
                }
            }
        }
        FlatGrid { num_inputs: self.num_inputs, level: self.level.clone(), index: self.index.clone(), parent }
    }

    pub fn serialize(&self, format: SerializationFormat) -> Result<Vec<u8>, SGError>
    {
        crate::serialization::serialize(&StorageDescription::from(self), format)
    }

    ///
    /// Rebuilds a storage with the exact position numbering it was written with.
    ///
    pub fn deserialize(buffer: &[u8], format: SerializationFormat) -> Result<Self, SGError>
    {
        let description: StorageDescription = crate::serialization::deserialize(buffer, format)?;
        description.try_into()
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct StorageDescription
{
    version: u32,
    num_inputs: usize,
    has_boundary: bool,
    bounding_box: BoundingBox,
    level: Vec<u8>,
    index: Vec<u32>,
}

impl From<&GridStorage> for StorageDescription
{
    fn from(storage: &GridStorage) -> Self
    {
        Self
        {
            version: STORAGE_VERSION,
            num_inputs: storage.num_inputs,
            has_boundary: storage.has_boundary,
            bounding_box: storage.bounding_box.clone(),
            level: storage.level.clone(),
            index: storage.index.clone(),
        }
    }
}

impl TryFrom<StorageDescription> for GridStorage
{
    type Error = SGError;

    fn try_from(value: StorageDescription) -> Result<Self, Self::Error>
    {
        if value.version != STORAGE_VERSION
        {
            return Err(SGError::UnsupportedVersion(value.version));
        }
        let mut storage = GridStorage::new(value.num_inputs).map_err(|_| SGError::DeserializationFailed)?;
        if value.level.len() != value.index.len() || value.level.len() % value.num_inputs != 0
            || value.bounding_box.lower.len() != value.num_inputs || value.bounding_box.upper.len() != value.num_inputs
        {
            return Err(SGError::DeserializationFailed);
        }
        storage.has_boundary = value.has_boundary;
        storage.bounding_box = value.bounding_box;
        for (level, index) in value.level.chunks_exact(value.num_inputs).zip(value.index.chunks_exact(value.num_inputs))
        {
            let point = GridPoint::new(level, index);
            let valid = (0..value.num_inputs).all(|d| point.get(d).is_valid(value.has_boundary));
            if !valid || storage.contains(&point)
            {
                return Err(SGError::DeserializationFailed);
            }
            storage.push(point, false);
        }
        storage.recalc_leaf_property();
        Ok(storage)
    }
}

pub struct NodeIterator<'a>
{
    storage: &'a GridStorage,
    current_seq: usize,
}

impl<'a> NodeIterator<'a>
{
    pub fn new(storage: &'a GridStorage) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl<'a> Iterator for NodeIterator<'a>
{
    type Item = GridPointRef<'a>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.current_seq < self.storage.len()
        {
            self.current_seq += 1;
            Some(self.storage.point_ref(self.current_seq - 1))
        }
        else
        {
            None
        }
    }
}

pub struct PointIterator<'a>
{
    storage: &'a GridStorage,
    current_seq: usize,
}

impl<'a> PointIterator<'a>
{
    pub fn new(storage: &'a GridStorage) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl Iterator for PointIterator<'_>
{
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.current_seq < self.storage.len()
        {
            let mut point = self.storage.unit_coordinate(self.current_seq);
            self.storage.bounding_box.to_real_coordinate_in_place(&mut point);
            self.current_seq += 1;
            Some(point)
        }
        else
        {
            None
        }
    }
}
