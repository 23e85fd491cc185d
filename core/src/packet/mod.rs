//! Packet: a zero-copy, refcounted byte buffer with slicing operations.
//!
//! Grounded in `original_source/include/click/packet.hh`-family semantics
//! (via spec.md §3/§4.1): exclusive ownership (`Arc::strong_count == 1`)
//! makes the buffer writable in place; shared ownership requires
//! [`Packet::uniqueify`] before any mutation. `Arc::make_mut` gives us this
//! for free — it is precisely "clone on write if shared, otherwise hand
//! back the existing allocation" — so the buffer itself is represented as
//! `Arc<SharedStorage>` rather than reimplementing a bespoke refcount.

pub mod annotation;
pub mod batch;

pub use annotation::AnnotationArea;
pub use batch::PacketBatch;

use std::sync::Arc;

/// Failure modes for packet slicing operations (spec.md §4.1 "Failure").
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("offset out of range")]
    OffsetOutOfRange,
}

/// Byte offsets into the buffer marking the start of each protocol layer,
/// satisfying `mac <= network <= transport <= data + length` whenever set
/// (spec.md §3 Packet invariants).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayerOffsets {
    pub mac: Option<usize>,
    pub network: Option<usize>,
    pub transport: Option<usize>,
}

/// The backing allocation, shared via `Arc` across every clone of a packet.
///
/// Carries the optional user destructor (spec.md §3: "an optional user
/// destructor") at the *storage* level rather than on individual `Packet`
/// views: the destructor is a property of one physical allocation (e.g. "give
/// this mbuf back to its DPDK pool"), so it must fire exactly once, on
/// whichever packet happens to hold the last reference — not on whichever
/// packet happened to attach it. A `uniqueify`-driven copy allocates fresh
/// memory with no external resource behind it, so the clone used by
/// `Arc::make_mut` drops the destructor rather than carrying it forward.
struct SharedStorage {
    data: Vec<u8>,
    destructor: Option<Box<dyn FnOnce(&mut Vec<u8>) + Send>>,
}

impl Clone for SharedStorage {
    fn clone(&self) -> Self {
        SharedStorage {
            data: self.data.clone(),
            destructor: None,
        }
    }
}

impl Drop for SharedStorage {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.take() {
            destructor(&mut self.data);
        }
    }
}

/// A refcounted byte buffer with headroom/tailroom and a 48-byte
/// annotation scratch area.
///
/// Each `Packet` is an independent view (`data_offset`, `length`,
/// [`LayerOffsets`], [`AnnotationArea`]) over a possibly-shared
/// `Arc<SharedStorage>` backing store. Cloning a `Packet` via
/// [`Packet::share`] bumps the `Arc`'s strong count without copying bytes;
/// it does not duplicate the view, so the two resulting packets are
/// independent snapshots of the same storage until one of them calls
/// [`Packet::uniqueify`].
pub struct Packet {
    storage: Arc<SharedStorage>,
    data_offset: usize,
    length: usize,
    layers: LayerOffsets,
    annotations: AnnotationArea,
}

impl Packet {
    /// Builds a packet from raw bytes, placing the data flush with the
    /// front of the buffer (no headroom) and no tailroom.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let length = bytes.len();
        Packet {
            storage: Arc::new(SharedStorage {
                data: bytes,
                destructor: None,
            }),
            data_offset: 0,
            length,
            layers: LayerOffsets::default(),
            annotations: AnnotationArea::default(),
        }
    }

    /// Builds a packet with `headroom` bytes of free space before the data
    /// and `tailroom` bytes of free space after it, as input elements
    /// typically do so that later `push`/`put` calls need no reallocation.
    pub fn with_headroom(payload: &[u8], headroom: usize, tailroom: usize) -> Self {
        let mut data = vec![0u8; headroom + payload.len() + tailroom];
        data[headroom..headroom + payload.len()].copy_from_slice(payload);
        Packet {
            storage: Arc::new(SharedStorage {
                data,
                destructor: None,
            }),
            data_offset: headroom,
            length: payload.len(),
            layers: LayerOffsets::default(),
            annotations: AnnotationArea::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn headroom(&self) -> usize {
        self.data_offset
    }

    pub fn tailroom(&self) -> usize {
        self.storage.data.len() - self.data_offset - self.length
    }

    pub fn buffer_size(&self) -> usize {
        self.storage.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.storage.data[self.data_offset..self.data_offset + self.length]
    }

    /// Mutable access to packet data. Returns `None` if the buffer is
    /// currently shared — call [`Packet::uniqueify`] first (spec.md §3:
    /// "if ownership is exclusive the buffer may be written in place;
    /// otherwise a copy-on-write path must be taken").
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        if !self.is_writable() {
            return None;
        }
        let off = self.data_offset;
        let len = self.length;
        let storage = Arc::get_mut(&mut self.storage).expect("checked writable above");
        Some(&mut storage.data[off..off + len])
    }

    pub fn is_writable(&self) -> bool {
        Arc::strong_count(&self.storage) == 1
    }

    /// Guarantees exclusive ownership of the buffer, copying the bytes if
    /// another packet shares them. A no-op when already exclusive.
    pub fn uniqueify(&mut self) {
        Arc::make_mut(&mut self.storage);
    }

    /// Increments the buffer's refcount without copying data. The two
    /// resulting packets are independent views (separate offsets,
    /// annotations) over the same storage.
    pub fn share(&self) -> Packet {
        Packet {
            storage: Arc::clone(&self.storage),
            data_offset: self.data_offset,
            length: self.length,
            layers: self.layers,
            annotations: self.annotations,
        }
    }

    /// Advances the data pointer by `n`, shrinking the packet from the
    /// front (consumes headroom).
    pub fn pull(&mut self, n: usize) -> Result<(), PacketError> {
        if n > self.length {
            return Err(PacketError::OffsetOutOfRange);
        }
        self.data_offset += n;
        self.length -= n;
        Ok(())
    }

    /// Retracts the data pointer by `n`, growing the packet into existing
    /// headroom (prepend).
    pub fn push_header(&mut self, n: usize) -> Result<(), PacketError> {
        if n > self.data_offset {
            return Err(PacketError::OffsetOutOfRange);
        }
        self.data_offset -= n;
        self.length += n;
        Ok(())
    }

    /// Shortens the packet by `n` bytes from the tail.
    pub fn take(&mut self, n: usize) -> Result<(), PacketError> {
        if n > self.length {
            return Err(PacketError::OffsetOutOfRange);
        }
        self.length -= n;
        Ok(())
    }

    /// Extends the packet by `n` bytes at the tail, growing the backing
    /// storage (and uniqueifying it) if there is insufficient tailroom.
    pub fn put(&mut self, n: usize) -> Result<(), PacketError> {
        if self.tailroom() < n {
            self.grow_tailroom(n);
        }
        self.length += n;
        Ok(())
    }

    fn grow_tailroom(&mut self, at_least: usize) {
        let needed = self.data_offset + self.length + at_least;
        let storage = Arc::make_mut(&mut self.storage);
        storage.data.resize(needed, 0);
    }

    pub fn layers(&self) -> LayerOffsets {
        self.layers
    }

    /// Sets layer offsets, asserting `mac <= network <= transport <=
    /// data_offset + length` (spec.md §3). Any offset left `None` is
    /// skipped by the ordering check.
    pub fn set_layers(&mut self, layers: LayerOffsets) {
        let end = self.data_offset + self.length;
        let ordered = [layers.mac, layers.network, layers.transport, Some(end)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        for pair in ordered.windows(2) {
            debug_assert!(pair[0] <= pair[1], "layer offsets out of order");
        }
        self.layers = layers;
    }

    pub fn annotations(&self) -> &AnnotationArea {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationArea {
        &mut self.annotations
    }

    /// Attaches a user destructor to this packet's *storage*, invoked
    /// exactly once, just before the last reference to that storage is
    /// dropped. Requires exclusive ownership so it is unambiguous which
    /// allocation the destructor is being attached to.
    pub fn set_destructor(&mut self, destructor: impl FnOnce(&mut Vec<u8>) + Send + 'static) {
        let storage = Arc::get_mut(&mut self.storage)
            .expect("set_destructor requires an exclusively-owned packet");
        storage.destructor = Some(Box::new(destructor));
    }
}
