use crate::{errors::SGError, storage::{GridPoint, GridStorage, MAX_LEVEL}};

fn check_level(level: usize) -> Result<u8, SGError>
{
    if level == 0 || level > MAX_LEVEL as usize
    {
        return Err(SGError::LevelOutOfRange(level as u32));
    }
    Ok(level as u8)
}

///
/// Fill dimension 0 with the full 1d hierarchy up to `n`. Every other dimension
/// stays at (1, 1) until the dimension loop expands it.
///
fn first_dimension(storage: &mut GridStorage, n: u8)
{
    let mut point = GridPoint::root(storage.num_inputs);
    for l in 1..=n
    {
        for i in (1..(1_u32 << l)).step_by(2)
        {
            point.level[0] = l;
            point.index[0] = i;
            storage.push(point.clone(), false);
        }
    }
}

///
/// Generates a regular sparse grid of level `level` without boundaries: all inner points
/// whose level sum is at most `level + d - 1`.
///
pub fn regular(storage: &mut GridStorage, level: usize) -> Result<(), SGError>
{
    let n = check_level(level)?;
    let num_inputs = storage.num_inputs as u32;
    first_dimension(storage, n);
    // Generate grid points in all other dimensions:
    // loop dim times over intermediate grid, take all grid points and
    // modify them in current dimension d
    for d in 1..storage.num_inputs
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            let level_sum = point.level_sum() - 1;
            let level_max = point.level_max();
            let mut l: u8 = 1;
            while l as u32 + level_sum <= n as u32 + num_inputs - 1 && l.max(level_max) <= n
            {
                for i in (1..(1_u32 << l)).step_by(2)
                {
                    point.level[d] = l;
                    point.index[d] = i;
                    if first
                    {
                        storage.update(point.clone(), g)?;
                        first = false;
                    }
                    else
                    {
                        storage.push(point.clone(), false);
                    }
                }
                l += 1;
            }
        }
    }
    storage.recalc_leaf_property();
    log::debug!("generated regular grid of level {level} in {} dimensions with {} points", storage.num_inputs, storage.len());
    Ok(())
}

///
/// Generates a full grid of level `level` without boundaries, `(2^level - 1)^d` points.
///
pub fn full(storage: &mut GridStorage, level: usize) -> Result<(), SGError>
{
    let n = check_level(level)?;
    first_dimension(storage, n);
    for d in 1..storage.num_inputs
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            for l in 1..=n
            {
                for i in (1..(1_u32 << l)).step_by(2)
                {
                    point.level[d] = l;
                    point.index[d] = i;
                    if first
                    {
                        storage.update(point.clone(), g)?;
                        first = false;
                    }
                    else
                    {
                        storage.push(point.clone(), false);
                    }
                }
            }
        }
    }
    storage.recalc_leaf_property();
    log::debug!("generated full grid of level {level} in {} dimensions with {} points", storage.num_inputs, storage.len());
    Ok(())
}

///
/// Appends every missing ancestor (and missing boundary sibling) of every point. Points added
/// here are visited as well, so the grid is admissible on return.
///
fn complete_ancestors(storage: &mut GridStorage)
{
    let original_number = storage.len();
    let mut seq = 0;
    while seq < storage.len()
    {
        let point = storage.point(seq);
        for dim in 0..storage.num_inputs
        {
            for required in storage.required_neighbours(&point, dim)
            {
                if !storage.contains(&required)
                {
                    storage.push(required, false);
                }
            }
        }
        seq += 1;
    }
    if storage.len() > original_number
    {
        log::debug!("added {} ancestors to keep the grid admissible", storage.len() - original_number);
    }
}

///
/// Generates a regular sparse grid of level `level` with boundary points. `boundary_level`
/// controls how far the boundary is truncated: a level-sum penalty of `boundary_level` is
/// charged for every zero level. A value of 1 gives the usual truncated boundary grid. Larger
/// values drop boundary points that interior points rely on; those are added back, so the
/// result is always admissible.
///
pub fn regular_with_boundaries(storage: &mut GridStorage, level: usize, boundary_level: Option<usize>) -> Result<(), SGError>
{
    let n = check_level(level)? as u32;
    let boundary_level = boundary_level.unwrap_or(1).max(1) as u32;
    storage.has_boundary = true;
    let mut point = GridPoint::root(storage.num_inputs);

    point.level[0] = 0;
    point.index[0] = 0;
    storage.push(point.clone(), false);
    point.index[0] = 1;
    storage.push(point.clone(), false);
    for l in 1..=n as u8
    {
        for i in (1..(1_u32 << l)).step_by(2)
        {
            point.level[0] = l;
            point.index[0] = i;
            storage.push(point.clone(), false);
        }
    }

    for d in 1..storage.num_inputs
    {
        let ngrids = storage.len();
        let cur_dim = d as u32 + 1;
        for g in 0..ngrids
        {
            let mut point = storage.point(g);
            let level_sum: u32 = point.level[..d].iter().map(|&l| l as u32).sum();
            let num_zero_levels = point.level[..d].iter().filter(|&&l| l == 0).count() as u32;

            // the new boundary functions add a zero level in dimension d
            let mut first = true;
            if level_sum + boundary_level + num_zero_levels < n + cur_dim || num_zero_levels == cur_dim - 1
            {
                point.level[d] = 0;
                point.index[d] = 0;
                storage.update(point.clone(), g)?;
                point.index[d] = 1;
                storage.push(point.clone(), false);
                first = false;
            }
            let upper_bound = if num_zero_levels > 0
            {
                if n + cur_dim < boundary_level + num_zero_levels
                {
                    continue;
                }
                n + cur_dim - num_zero_levels - boundary_level
            }
            else
            {
                n + cur_dim - 1
            };
            let level_max = point.level.iter().enumerate().filter(|&(j, _)| j != d).map(|(_, &l)| l).max().unwrap_or(0);
            let mut l: u8 = 1;
            while l as u32 + level_sum <= upper_bound && l.max(level_max) as u32 <= n
            {
                for i in (1..(1_u32 << l)).step_by(2)
                {
                    point.level[d] = l;
                    point.index[d] = i;
                    if first
                    {
                        storage.update(point.clone(), g)?;
                        first = false;
                    }
                    else
                    {
                        storage.push(point.clone(), false);
                    }
                }
                l += 1;
            }
        }
    }
    if boundary_level > 1
    {
        complete_ancestors(storage);
    }
    storage.recalc_leaf_property();
    log::debug!("generated boundary grid of level {level} in {} dimensions with {} points", storage.num_inputs, storage.len());
    Ok(())
}

///
/// Generates a full grid of level `level` including both boundary keys in every
/// dimension, `(2^level + 1)^d` points.
///
pub fn full_with_boundaries(storage: &mut GridStorage, level: usize) -> Result<(), SGError>
{
    let n = check_level(level)?;
    storage.has_boundary = true;
    let mut point = GridPoint::root(storage.num_inputs);
    point.level[0] = 0;
    point.index[0] = 0;
    storage.push(point.clone(), false);
    point.index[0] = 1;
    storage.push(point.clone(), false);
    for l in 1..=n
    {
        for i in (1..(1_u32 << l)).step_by(2)
        {
            point.level[0] = l;
            point.index[0] = i;
            storage.push(point.clone(), false);
        }
    }
    for d in 1..storage.num_inputs
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut point = storage.point(g);
            point.level[d] = 0;
            point.index[d] = 0;
            storage.update(point.clone(), g)?;
            point.index[d] = 1;
            storage.push(point.clone(), false);
            for l in 1..=n
            {
                point.level[d] = l;
                for i in (1..(1_u32 << l)).step_by(2)
                {
                    point.index[d] = i;
                    storage.push(point.clone(), false);
                }
            }
        }
    }
    storage.recalc_leaf_property();
    Ok(())
}

#[test]
fn test_regular()
{
    let mut storage = GridStorage::new(2).unwrap();
    regular(&mut storage, 3).expect("Could not generate grid");
    assert_eq!(storage.len(), 17);
    assert!(storage.check_admissibility().is_ok());
    assert!(storage.contains(&GridPoint::new(&[3, 1], &[5, 1])));
    assert!(!storage.contains(&GridPoint::new(&[3, 2], &[5, 1])));
    assert!(!storage.is_leaf(storage.index_of(&GridPoint::root(2)).unwrap()));
    assert!(storage.is_leaf(storage.index_of(&GridPoint::new(&[2, 2], &[1, 3])).unwrap()));

    let mut storage = GridStorage::new(3).unwrap();
    regular(&mut storage, 3).expect("Could not generate grid");
    assert_eq!(storage.len(), 31);
}

#[test]
fn test_full()
{
    let mut storage = GridStorage::new(2).unwrap();
    full(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 9);
    let mut storage = GridStorage::new(1).unwrap();
    full_with_boundaries(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 5);
    let mut storage = GridStorage::new(2).unwrap();
    full_with_boundaries(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 25);
    assert!(storage.check_admissibility().is_ok());
}

#[test]
fn test_truncated_boundaries_1d()
{
    let mut storage = GridStorage::new(1).unwrap();
    regular_with_boundaries(&mut storage, 2, Some(1)).expect("Could not generate grid");
    assert_eq!(storage.len(), 5);
    assert!(storage.has_boundary());
}

#[test]
fn test_truncated_boundaries_2d()
{
    let mut storage = GridStorage::new(2).unwrap();
    regular_with_boundaries(&mut storage, 2, Some(1)).expect("Could not generate grid");
    assert_eq!(storage.len(), 21);
    let mut storage2 = GridStorage::new(2).unwrap();
    regular_with_boundaries(&mut storage2, 3, Some(1)).expect("Could not generate grid");
    assert_eq!(storage2.len(), 49);
    assert!(storage2.contains(&GridPoint::new(&[1, 1], &[1, 1])));
    assert!(storage2.contains(&GridPoint::new(&[1, 2], &[1, 1])));
    assert!(storage2.contains(&GridPoint::new(&[2, 2], &[3, 1])));
    assert!(!storage2.contains(&GridPoint::new(&[3, 2], &[5, 1])));
    assert!(storage2.contains(&GridPoint::new(&[3, 1], &[5, 1])));
    assert!(storage2.contains(&GridPoint::new(&[3, 0], &[5, 0])));
    assert!(storage2.contains(&GridPoint::new(&[0, 0], &[0, 0])));
    assert!(storage2.check_admissibility().is_ok());
}

#[test]
fn test_truncated_boundaries_stay_admissible()
{
    for (dim, level, boundary_level) in [(2, 3, 2), (2, 4, 3), (3, 3, 2), (3, 4, 4)]
    {
        let mut storage = GridStorage::new(dim).unwrap();
        regular_with_boundaries(&mut storage, level, Some(boundary_level)).expect("Could not generate grid");
        assert!(storage.check_admissibility().is_ok());
    }
    let mut storage = GridStorage::new(2).unwrap();
    regular_with_boundaries(&mut storage, 3, Some(2)).expect("Could not generate grid");
    assert!(storage.contains(&GridPoint::new(&[3, 1], &[1, 1])));
    assert!(storage.contains(&GridPoint::new(&[3, 0], &[1, 0])));
    assert!(storage.contains(&GridPoint::new(&[3, 0], &[1, 1])));
}

#[test]
fn test_level_out_of_range()
{
    let mut storage = GridStorage::new(2).unwrap();
    assert_eq!(regular(&mut storage, 0), Err(SGError::LevelOutOfRange(0)));
    assert_eq!(full(&mut storage, 31), Err(SGError::LevelOutOfRange(31)));
}
