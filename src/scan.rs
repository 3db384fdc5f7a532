use fnv::FnvHashMap;
use std::collections::hash_map;

/// Dual-mode scan over one axis of the sparse grid.
///
/// Given an inclusive index range over a populated map, either probes every
/// index of the range, or walks every populated entry, whichever touches
/// fewer entries. Both modes visit the same populated in-range entries; the
/// full walk may additionally hand out entries outside the range, which
/// callers reject with the geometric tests they apply anyway.
pub enum AxisScan<'a, T> {
    Probe {
        map: &'a FnvHashMap<i32, T>,
        cur: i64,
        end: i64,
        step: i64,
    },
    Full(hash_map::Iter<'a, i32, T>),
}

impl<'a, T> AxisScan<'a, T> {
    /// Scan `[min, max]` from `min` upwards.
    pub fn ascending(map: &'a FnvHashMap<i32, T>, min: i32, max: i32) -> Self {
        Self::pick(map, min, max, i64::from(min), 1)
    }

    /// Scan `[min, max]` from `max` downwards.
    pub fn descending(map: &'a FnvHashMap<i32, T>, min: i32, max: i32) -> Self {
        Self::pick(map, min, max, i64::from(max), -1)
    }

    // Range arithmetic is done in i64: `max - min + 1` overflows i32 for the
    // saturated windows an infinite radius produces, and those windows must
    // compare as larger than any population.
    fn pick(map: &'a FnvHashMap<i32, T>, min: i32, max: i32, start: i64, step: i64) -> Self {
        let span = i64::from(max) - i64::from(min) + 1;
        if span > map.len() as i64 {
            AxisScan::Full(map.iter())
        } else {
            AxisScan::Probe {
                map,
                cur: start,
                end: i64::from(if step > 0 { max } else { min }),
                step,
            }
        }
    }
}

impl<'a, T> Iterator for AxisScan<'a, T> {
    type Item = (i32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            AxisScan::Probe {
                map,
                cur,
                end,
                step,
            } => {
                // Copy the shared reference out so the probed values borrow
                // the map for 'a, not for this call.
                let map = *map;
                loop {
                    if (*end - *cur) * *step < 0 {
                        return None;
                    }
                    let idx = *cur as i32;
                    *cur += *step;
                    if let Some(v) = map.get(&idx) {
                        return Some((idx, v));
                    }
                }
            }
            AxisScan::Full(iter) => iter.next().map(|(&idx, v)| (idx, v)),
        }
    }
}
