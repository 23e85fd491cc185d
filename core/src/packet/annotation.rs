//! The 48-byte per-packet annotation area (spec.md §3, §4.1).
//!
//! The area is opaque to the framework: individual sub-ranges are assigned
//! to named annotations by convention, never overlapping. Keeping the
//! layout as a flat byte array (rather than a Rust struct with named
//! fields) preserves ABI compatibility with any out-of-scope collaborator
//! that reads/writes the same offsets directly — exactly the trade-off
//! spec.md's design notes call out ("keeping the on-wire layout if
//! interoperation with external modules is required").

pub const ANNOTATION_AREA_SIZE: usize = 48;

/// One annotation's location within the area. Annotations never overlap by
/// construction: the constants below were laid out by hand to guarantee it,
/// and `AnnotationArea::read`/`write` panic on an out-of-bounds slot rather
/// than silently corrupting a neighboring annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnnotationSlot {
    pub offset: usize,
    pub size: usize,
}

impl AnnotationSlot {
    pub const fn new(offset: usize, size: usize) -> Self {
        AnnotationSlot { offset, size }
    }
}

pub const DST_IP: AnnotationSlot = AnnotationSlot::new(0, 4);
pub const AGGREGATE_ID: AnnotationSlot = AnnotationSlot::new(4, 4);
pub const PAINT: AnnotationSlot = AnnotationSlot::new(8, 1);
pub const PAINT2: AnnotationSlot = AnnotationSlot::new(9, 1);
pub const PERF_COUNTER: AnnotationSlot = AnnotationSlot::new(16, 8);
pub const FIRST_TIMESTAMP: AnnotationSlot = AnnotationSlot::new(24, 8);
pub const SEQUENCE_NUMBER: AnnotationSlot = AnnotationSlot::new(32, 4);

/// The fixed-size scratch area itself, carried inline on every [`super::Packet`].
#[derive(Clone, Copy)]
pub struct AnnotationArea([u8; ANNOTATION_AREA_SIZE]);

impl Default for AnnotationArea {
    fn default() -> Self {
        AnnotationArea([0u8; ANNOTATION_AREA_SIZE])
    }
}

impl AnnotationArea {
    pub fn read(&self, slot: AnnotationSlot) -> &[u8] {
        &self.0[slot.offset..slot.offset + slot.size]
    }

    pub fn write(&mut self, slot: AnnotationSlot, bytes: &[u8]) {
        assert_eq!(bytes.len(), slot.size, "annotation write size mismatch");
        self.0[slot.offset..slot.offset + slot.size].copy_from_slice(bytes);
    }

    pub fn read_u32(&self, slot: AnnotationSlot) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read(slot));
        u32::from_ne_bytes(buf)
    }

    pub fn write_u32(&mut self, slot: AnnotationSlot, value: u32) {
        self.write(slot, &value.to_ne_bytes());
    }

    pub fn read_u64(&self, slot: AnnotationSlot) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read(slot));
        u64::from_ne_bytes(buf)
    }

    pub fn write_u64(&mut self, slot: AnnotationSlot, value: u64) {
        self.write(slot, &value.to_ne_bytes());
    }

    pub fn paint(&self) -> u8 {
        self.read(PAINT)[0]
    }

    pub fn set_paint(&mut self, value: u8) {
        self.write(PAINT, &[value]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotations_do_not_overlap() {
        let slots = [
            DST_IP,
            AGGREGATE_ID,
            PAINT,
            PAINT2,
            PERF_COUNTER,
            FIRST_TIMESTAMP,
            SEQUENCE_NUMBER,
        ];
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                let a_end = a.offset + a.size;
                let b_end = b.offset + b.size;
                let overlaps = a.offset < b_end && b.offset < a_end;
                assert!(!overlaps, "{a:?} overlaps {b:?}");
            }
            assert!(a.offset + a.size <= ANNOTATION_AREA_SIZE);
        }
    }

    #[test]
    fn round_trip_u32() {
        let mut area = AnnotationArea::default();
        area.write_u32(SEQUENCE_NUMBER, 0xdead_beef);
        assert_eq!(area.read_u32(SEQUENCE_NUMBER), 0xdead_beef);
    }
}
