use crate::storage::{GridPoint, GridStorage, LevelIndex, MAX_LEVEL};

///
/// Cursor over the implicit hierarchy of a [`GridStorage`]. Moves are pure key arithmetic;
/// after each move the cursor resolves its position, which is `None` when the key is not
/// stored.
///
pub struct GridIterator<'a>
{
    storage: &'a GridStorage,
    point: GridPoint,
    seq: Option<usize>,
}

impl<'a> GridIterator<'a>
{
    ///
    /// Creates a cursor at the level-one root.
    ///
    pub fn new(storage: &'a GridStorage) -> Self
    {
        let point = GridPoint::root(storage.num_inputs());
        let seq = storage.index_of(&point);
        Self { storage, point, seq }
    }

    #[inline]
    fn resolve(&mut self) -> bool
    {
        self.seq = self.storage.index_of(&self.point);
        self.seq.is_some()
    }

    #[inline]
    fn set(&mut self, dim: usize, key: LevelIndex) -> bool
    {
        self.point.set(dim, key);
        self.resolve()
    }

    #[inline(always)]
    pub fn storage(&self) -> &'a GridStorage
    {
        self.storage
    }

    #[inline(always)]
    pub fn seq(&self) -> Option<usize>
    {
        self.seq
    }

    #[inline(always)]
    pub fn point(&self) -> &GridPoint
    {
        &self.point
    }

    #[inline]
    pub fn key(&self, dim: usize) -> LevelIndex
    {
        self.point.get(dim)
    }

    pub fn reset_to_level_zero(&mut self) -> bool
    {
        self.point.level.fill(0);
        self.point.index.fill(0);
        self.resolve()
    }

    pub fn reset_to_left_level_zero(&mut self, dim: usize) -> bool
    {
        self.set(dim, LevelIndex::left_boundary())
    }

    pub fn reset_to_right_level_zero(&mut self, dim: usize) -> bool
    {
        self.set(dim, LevelIndex::right_boundary())
    }

    pub fn reset_to_level_one(&mut self, dim: usize) -> bool
    {
        self.set(dim, LevelIndex::level_one())
    }

    pub fn left_child(&mut self, dim: usize) -> bool
    {
        let key = self.key(dim);
        self.set(dim, key.left_child())
    }

    pub fn right_child(&mut self, dim: usize) -> bool
    {
        let key = self.key(dim);
        self.set(dim, key.right_child())
    }

    ///
    /// Moves from a left child to its right sibling.
    ///
    pub fn step_right(&mut self, dim: usize) -> bool
    {
        let key = self.key(dim);
        self.set(dim, LevelIndex::new(key.level, key.index + 2))
    }

    pub fn up(&mut self, dim: usize) -> bool
    {
        let key = self.key(dim);
        self.set(dim, key.parent())
    }

    ///
    /// Missing positions count as leaves, so a sweep never descends from them.
    ///
    pub fn is_leaf(&self) -> bool
    {
        match self.seq
        {
            Some(seq) => self.storage.is_leaf(seq),
            None => true,
        }
    }

    ///
    /// True if an inner key may have stored children along `dim`.
    ///
    #[inline]
    pub fn can_descend(&self, dim: usize) -> bool
    {
        let level = self.point.level[dim];
        !self.is_leaf() && level > 0 && level < MAX_LEVEL
    }

    pub fn has_left_child(&self, dim: usize) -> bool
    {
        let key = self.key(dim);
        key.level > 0 && key.level < MAX_LEVEL && self.storage.contains(&self.point.with(dim, key.left_child()))
    }

    pub fn has_right_child(&self, dim: usize) -> bool
    {
        let key = self.key(dim);
        key.level > 0 && key.level < MAX_LEVEL && self.storage.contains(&self.point.with(dim, key.right_child()))
    }
}

#[test]
fn test_navigation()
{
    let mut storage = GridStorage::new(2).unwrap();
    crate::generators::regular(&mut storage, 3).expect("Could not generate grid");
    let mut iterator = GridIterator::new(&storage);
    assert_eq!(iterator.seq(), storage.index_of(&GridPoint::root(2)));
    assert!(!iterator.is_leaf());
    assert!(iterator.left_child(0));
    assert_eq!(iterator.key(0), LevelIndex::new(2, 1));
    assert!(iterator.has_left_child(0));
    assert!(iterator.has_left_child(1));
    assert!(iterator.left_child(0));
    assert!(!iterator.has_left_child(1));
    assert!(!iterator.has_right_child(0));
    assert!(iterator.up(0));
    assert!(iterator.step_right(0));
    assert_eq!(iterator.key(0), LevelIndex::new(2, 3));
    assert!(iterator.up(0));
    assert_eq!(iterator.point(), &GridPoint::root(2));
    assert!(!iterator.reset_to_level_zero());
    assert!(iterator.is_leaf());
}
