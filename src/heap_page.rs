use std::io::Cursor;
use std::sync::Arc;

use log::{debug, trace};

use crate::error::{DbError, DbResult};
use crate::field::Field;
use crate::io::Encodeable;
use crate::page_id::{HeapPageId, RecordId};
use crate::transaction_id::TransactionId;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// Returns the 0-based index of the lowest set bit in `byte`, or `-1` if
/// `byte` is zero. Uses Brian Kernighan's `n &= n - 1` trick to find the
/// lowest set bit rather than scanning bit-by-bit.
pub fn ffs(byte: u8) -> i32 {
    if byte == 0 {
        return -1;
    }
    // isolate the lowest set bit, then find its position
    let lowest = byte & byte.wrapping_neg();
    lowest.trailing_zeros() as i32
}

/// A slotted page of fixed-size tuple slots behind a header bitmap.
pub struct HeapPage {
    id: HeapPageId,
    desc: Arc<TupleDesc>,
    page_size: usize,
    num_slots: usize,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    before_image: Vec<u8>,
    dirty_owner: Option<TransactionId>,
}

impl HeapPage {
    pub fn num_slots_for(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    fn header_len(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    /// Decodes a page's bytes. Any occupied slot whose decoding fails is
    /// fatal (`DbError::Corrupt`).
    pub fn new(
        id: HeapPageId,
        desc: Arc<TupleDesc>,
        page_size: usize,
        bytes: &[u8],
    ) -> DbResult<Self> {
        if bytes.len() != page_size {
            return Err(DbError::Corrupt(format!(
                "expected {} bytes, got {}",
                page_size,
                bytes.len()
            )));
        }

        let tuple_size = desc.size();
        let num_slots = Self::num_slots_for(page_size, tuple_size);
        let header_len = Self::header_len(num_slots);
        let header = bytes[0..header_len].to_vec();

        let mut slots: Vec<Option<Tuple>> = Vec::with_capacity(num_slots);
        let mut offset = header_len;
        for slot in 0..num_slots {
            let slot_bytes = &bytes[offset..offset + tuple_size];
            if Self::slot_bit(&header, slot) {
                let mut cur = Cursor::new(slot_bytes);
                let mut fields = Vec::with_capacity(desc.len());
                for i in 0..desc.len() {
                    fields.push(Field::decode(desc.field_type(i), &mut cur)?);
                }
                let mut tuple = Tuple::from_fields(Arc::clone(&desc), fields)?;
                tuple.set_record_id(Some(RecordId::new(id, slot as i32)));
                slots.push(Some(tuple));
            } else {
                slots.push(None);
            }
            offset += tuple_size;
        }

        debug!("decoded heap page {:?}: {} slots", id, num_slots);

        Ok(HeapPage {
            id,
            desc,
            page_size,
            num_slots,
            header,
            slots,
            before_image: bytes.to_vec(),
            dirty_owner: None,
        })
    }

    /// Builds a fresh, entirely-empty page of the given id/descriptor.
    pub fn empty(id: HeapPageId, desc: Arc<TupleDesc>, page_size: usize) -> Self {
        let tuple_size = desc.size();
        let num_slots = Self::num_slots_for(page_size, tuple_size);
        let header_len = Self::header_len(num_slots);
        HeapPage {
            id,
            desc,
            page_size,
            num_slots,
            header: vec![0u8; header_len],
            slots: vec![None; num_slots],
            before_image: vec![0u8; page_size],
            dirty_owner: None,
        }
    }

    pub fn id(&self) -> HeapPageId {
        self.id
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    fn slot_bit(header: &[u8], slot: usize) -> bool {
        let byte = header[slot / 8];
        (byte & (1 << (slot % 8))) != 0
    }

    fn set_slot_bit(&mut self, slot: usize, used: bool) {
        let byte_index = slot / 8;
        if used {
            self.header[byte_index] |= 1 << (slot % 8);
        } else {
            self.header[byte_index] &= !(1 << (slot % 8));
        }
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        Self::slot_bit(&self.header, slot)
    }

    /// Number of empty slots, derived from the header popcount. Must agree
    /// with a slot-by-slot scan; both are computed here and compared as an
    /// internal consistency check.
    pub fn num_empty_slots(&self) -> usize {
        let from_header: usize = self
            .header
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum::<usize>();
        let occupied_by_header = from_header.min(self.num_slots);
        let occupied_by_scan = self.slots.iter().filter(|s| s.is_some()).count();
        debug_assert_eq!(
            occupied_by_header, occupied_by_scan,
            "header popcount disagrees with slot scan on page {:?}",
            self.id
        );
        self.num_slots - occupied_by_scan
    }

    /// Finds the lowest free slot index using the FFS primitive on each
    /// header byte's complement.
    fn find_free_slot(&self) -> Option<usize> {
        for (byte_index, &byte) in self.header.iter().enumerate() {
            let free_bits = !byte;
            let bit = ffs(free_bits);
            if bit < 0 {
                continue;
            }
            let slot = byte_index * 8 + bit as usize;
            if slot < self.num_slots {
                return Some(slot);
            }
        }
        None
    }

    /// Inserts into the lowest free slot, assigning the tuple's record id.
    pub fn insert(&mut self, mut tuple: Tuple) -> DbResult<()> {
        if tuple.tuple_desc().as_ref() != self.desc.as_ref() {
            return Err(DbError::SchemaMismatch(
                "tuple descriptor does not match page descriptor".to_string(),
            ));
        }
        let slot = self.find_free_slot().ok_or(DbError::PageFull(self.id))?;
        tuple.set_record_id(Some(RecordId::new(self.id, slot as i32)));
        self.set_slot_bit(slot, true);
        self.slots[slot] = Some(tuple);
        trace!("inserted tuple into {:?} slot {}", self.id, slot);
        Ok(())
    }

    /// Removes the tuple named by `tuple.record_id()`.
    pub fn delete(&mut self, tuple: &Tuple) -> DbResult<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::NotFoundOnPage(RecordId::new(self.id, -1)))?;
        if rid.page_id != self.id {
            return Err(DbError::NotFoundOnPage(rid));
        }
        let slot = rid.slot_index as usize;
        if slot >= self.num_slots || !self.is_slot_used(slot) {
            return Err(DbError::NotFoundOnPage(rid));
        }
        self.set_slot_bit(slot, false);
        self.slots[slot] = None;
        Ok(())
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: Option<TransactionId>) {
        self.dirty_owner = if dirty { tid } else { None };
    }

    pub fn dirty_owner(&self) -> Option<TransactionId> {
        self.dirty_owner
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_owner.is_some()
    }

    pub fn before_image(&self) -> &[u8] {
        &self.before_image
    }

    /// Serializes header, slots (zeroed when empty), then zero padding to
    /// `page_size`.
    pub fn page_data(&self) -> Vec<u8> {
        let tuple_size = self.desc.size();
        let mut buf = Vec::with_capacity(self.page_size);
        buf.extend_from_slice(&self.header);

        for slot in &self.slots {
            match slot {
                Some(tuple) => {
                    for field in tuple.fields() {
                        buf.extend_from_slice(&field.encode());
                    }
                }
                None => {
                    buf.extend(std::iter::repeat(0u8).take(tuple_size));
                }
            }
        }

        buf.resize(self.page_size, 0);
        buf
    }

    /// Yields occupied slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Type;
    use crate::tuple_desc::FieldItem;

    fn desc() -> Arc<TupleDesc> {
        Arc::new(
            TupleDesc::new(vec![
                FieldItem::new(Type::Int, Some("a")),
                FieldItem::new(Type::Str, Some("b")),
            ])
            .unwrap(),
        )
    }

    fn tuple(desc: &Arc<TupleDesc>, n: i32, s: &str) -> Tuple {
        Tuple::from_fields(Arc::clone(desc), vec![Field::Int(n), Field::Str(s.to_string())])
            .unwrap()
    }

    #[test]
    fn ffs_contract() {
        assert_eq!(ffs(0), -1);
        assert_eq!(ffs(1), 0);
        assert_eq!(ffs(3), 0);
        assert_eq!(ffs(0b00100010), 1);
        assert_eq!(ffs(0b11111100), 2);
        assert_eq!(ffs(0b10000000), 7);
        assert_eq!(ffs(0b01000000), 6);
    }

    #[test]
    fn round_trip_page_s1() {
        let d = desc();
        let pid = HeapPageId::new(1, 0);
        let mut page = HeapPage::empty(pid, Arc::clone(&d), 4096);
        page.insert(tuple(&d, 1, "a")).unwrap();
        page.insert(tuple(&d, 2, "bb")).unwrap();
        page.insert(tuple(&d, 3, "")).unwrap();

        let bytes = page.page_data();
        assert_eq!(bytes[0] & 0b0000_0111, 0b0000_0111);

        let reparsed = HeapPage::new(pid, d, 4096, &bytes).unwrap();
        let tuples: Vec<&Tuple> = reparsed.iter().collect();
        assert_eq!(tuples.len(), 3);
        assert_eq!(tuples[0].field(0), &Field::Int(1));
        assert_eq!(tuples[1].field(1), &Field::Str("bb".into()));
        assert_eq!(tuples[2].field(1), &Field::Str("".into()));
        for (i, t) in tuples.iter().enumerate() {
            assert_eq!(t.record_id().unwrap().slot_index, i as i32);
        }
        assert_eq!(reparsed.page_data(), bytes);
    }

    #[test]
    fn insert_then_delete_restores_empty_count() {
        let d = desc();
        let pid = HeapPageId::new(1, 0);
        let mut page = HeapPage::empty(pid, Arc::clone(&d), 4096);
        let initial_empty = page.num_empty_slots();

        let mut t = tuple(&d, 9, "z");
        page.insert(t.clone()).unwrap();
        assert_eq!(page.num_empty_slots(), initial_empty - 1);

        // re-fetch the tuple with its assigned record id for deletion
        let rid = page.iter().next().unwrap().record_id().unwrap();
        t.set_record_id(Some(rid));
        page.delete(&t).unwrap();
        assert_eq!(page.num_empty_slots(), initial_empty);
    }

    #[test]
    fn insert_fails_when_full() {
        let d = desc();
        let pid = HeapPageId::new(1, 0);
        let mut page = HeapPage::empty(pid, Arc::clone(&d), 4096);
        let cap = page.num_slots();
        for i in 0..cap {
            page.insert(tuple(&d, i as i32, "x")).unwrap();
        }
        let err = page.insert(tuple(&d, 999, "y")).unwrap_err();
        assert!(matches!(err, DbError::PageFull(_)));
    }

    #[test]
    fn delete_rejects_wrong_page_or_slot() {
        let d = desc();
        let pid = HeapPageId::new(1, 0);
        let other_pid = HeapPageId::new(1, 1);
        let mut page = HeapPage::empty(pid, Arc::clone(&d), 4096);
        let mut t = tuple(&d, 1, "a");
        t.set_record_id(Some(RecordId::new(other_pid, 0)));
        assert!(page.delete(&t).is_err());
    }
}
