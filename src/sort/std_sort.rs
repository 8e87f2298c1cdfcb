use crate::sort::{
    SortEntry,
    back_to_front,
};


pub fn sort_entries(entries: &mut [SortEntry]) {
    entries.sort_unstable_by(back_to_front);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_depths_keep_slot_order() {
        let mut entries = vec![
            SortEntry::new(1.0, 3),
            SortEntry::new(2.0, 2),
            SortEntry::new(1.0, 0),
            SortEntry::new(f32::NEG_INFINITY, 1),
        ];

        sort_entries(&mut entries);

        let order: Vec<u32> = entries.iter().map(|e| e.index).collect();
        assert_eq!(order, vec![2, 0, 3, 1]);
    }
}
