//! Streaming pack emission.
//!
//! The writer orders its input once, then makes a single pass: every object
//! either becomes a full deflated entry or an OFS_DELTA against a base
//! selected from the preceding window. All emitted bytes feed the running
//! digest whose output becomes the 20-byte trailer, so a pack is produced
//! whole or not at all.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use delta::{encode_with_index, DeltaIndex, MAX_INDEX_BYTES};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::candidates::{
    accept_delta, emission_order, find_best, CANDIDATE_WINDOW, MIN_SIZE_FOR_DELTA,
};
use crate::deflate::{CompressionLevel, Deflate, Zlib};
use crate::digest::{PackDigest, Sha1Digest};
use crate::error::{PackError, PackResult};
use crate::header::{write_entry_header, write_ofs_backref, OFS_DELTA};
use crate::object::{ObjectId, ObjectKind, ObjectSource, PackObject};
use crate::{PACK_SIGNATURE, PACK_VERSION};

/// Tunables for a pack write.
#[derive(Clone, Debug)]
pub struct PackOptions {
    /// Zlib level applied to every entry body.
    pub compression: CompressionLevel,
    /// Largest payload the delta machinery will index; larger objects are
    /// emitted as full entries with no delta attempt.
    pub max_index_bytes: usize,
    /// Cooperative cancellation flag, observed at entry boundaries only.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl PackOptions {
    /// Returns the default options: default compression, the standard
    /// 100 MiB index limit, no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compression: CompressionLevel::Default,
            max_index_bytes: MAX_INDEX_BYTES,
            cancel: None,
        }
    }
}

impl Default for PackOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a completed pack write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PackSummary {
    /// Total entries emitted, equal to the header count.
    pub entries: usize,
    /// Entries emitted as full deflated objects.
    pub full_entries: usize,
    /// Entries emitted as offset deltas.
    pub delta_entries: usize,
    /// Total pack size including header and trailer.
    pub bytes_written: u64,
    /// The 20-byte trailer appended to the stream.
    pub trailer: [u8; 20],
}

/// Single-pass pack-v2 writer.
#[derive(Clone, Debug, Default)]
pub struct PackWriter {
    options: PackOptions,
}

impl PackWriter {
    /// Creates a writer with [`PackOptions::new`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: PackOptions::new(),
        }
    }

    /// Creates a writer with explicit options.
    #[must_use]
    pub fn with_options(options: PackOptions) -> Self {
        Self { options }
    }

    /// Returns the options in force.
    #[must_use]
    pub const fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Writes a pack over `objects` into `sink` using the stock zlib
    /// compressor and SHA-1 digest.
    ///
    /// # Errors
    ///
    /// See [`write_pack_with`](Self::write_pack_with).
    pub fn write_pack<W: Write>(
        &self,
        objects: &[PackObject<'_>],
        sink: &mut W,
    ) -> PackResult<PackSummary> {
        self.write_pack_with(
            objects,
            sink,
            &Zlib::new(self.options.compression),
            Sha1Digest::new(),
        )
    }

    /// Writes a pack with caller-supplied collaborators.
    ///
    /// Entries are emitted in the order defined by the base-selection
    /// heuristics; every emitted byte passes through `digest`, whose final
    /// state becomes the trailer.
    ///
    /// # Errors
    ///
    /// The first collaborator failure aborts the write with no partial
    /// entry emitted: [`PackError::CompressionFailed`] from `deflate`,
    /// [`PackError::Io`] from the sink, [`PackError::Cancelled`] when the
    /// cancellation flag is observed at an entry boundary, and delta
    /// errors from the encoder.
    pub fn write_pack_with<W, D, H>(
        &self,
        objects: &[PackObject<'_>],
        sink: &mut W,
        deflate: &D,
        digest: H,
    ) -> PackResult<PackSummary>
    where
        W: Write,
        D: Deflate,
        H: PackDigest,
    {
        let count = u32::try_from(objects.len()).map_err(|_| PackError::InvalidHeader {
            reason: "entry count exceeds 32 bits",
        })?;
        let order = emission_order(objects);

        let mut digest = digest;
        let mut bytes_written: u64 = 0;

        self.check_cancel(0)?;

        let mut header = Vec::with_capacity(12);
        header.extend_from_slice(PACK_SIGNATURE);
        header.extend_from_slice(&PACK_VERSION.to_be_bytes());
        header.extend_from_slice(&count.to_be_bytes());
        sink.write_all(&header)?;
        digest.update(&header);
        bytes_written += header.len() as u64;

        let mut offsets: FxHashMap<ObjectId, u64> = FxHashMap::default();
        let mut depths: Vec<u32> = objects.iter().map(|object| object.depth()).collect();
        let mut full_entries = 0usize;
        let mut delta_entries = 0usize;
        let mut entry = Vec::new();

        for (position, &target_index) in order.iter().enumerate() {
            self.check_cancel(position)?;

            let target = &objects[target_index];
            let plan = self.plan_delta(objects, &order, &depths, &offsets, position)?;

            let entry_start = bytes_written;
            entry.clear();

            match plan {
                Some((base_index, delta_bytes)) => {
                    let base_start = offsets[objects[base_index].oid()];
                    write_entry_header(&mut entry, OFS_DELTA, delta_bytes.len() as u64);
                    write_ofs_backref(&mut entry, entry_start - base_start);
                    let body = deflate
                        .deflate(&delta_bytes)
                        .map_err(PackError::CompressionFailed)?;
                    entry.extend_from_slice(&body);
                    depths[target_index] = depths[base_index] + 1;
                    delta_entries += 1;
                    trace!(
                        oid = %target.oid(),
                        base = %objects[base_index].oid(),
                        raw_delta = delta_bytes.len(),
                        depth = depths[target_index],
                        "emitting delta entry"
                    );
                }
                None => {
                    write_entry_header(
                        &mut entry,
                        target.kind().type_code(),
                        target.payload().len() as u64,
                    );
                    let body = deflate
                        .deflate(target.payload())
                        .map_err(PackError::CompressionFailed)?;
                    entry.extend_from_slice(&body);
                    depths[target_index] = 0;
                    full_entries += 1;
                    trace!(oid = %target.oid(), kind = %target.kind(), "emitting full entry");
                }
            }

            sink.write_all(&entry)?;
            digest.update(&entry);
            bytes_written += entry.len() as u64;
            offsets.insert(*target.oid(), entry_start);
        }

        let trailer = digest.finalize();
        sink.write_all(&trailer)?;
        bytes_written += trailer.len() as u64;

        debug!(
            entries = objects.len(),
            full = full_entries,
            deltas = delta_entries,
            bytes = bytes_written,
            "pack complete"
        );

        Ok(PackSummary {
            entries: objects.len(),
            full_entries,
            delta_entries,
            bytes_written,
            trailer,
        })
    }

    /// Reads every object from `source` once, then writes the pack.
    ///
    /// # Errors
    ///
    /// Propagates [`PackError::ObjectNotFound`] from the source and every
    /// error [`write_pack`](Self::write_pack) can produce.
    pub fn write_from_source<S, W>(
        &self,
        oids: &[ObjectId],
        source: &S,
        sink: &mut W,
    ) -> PackResult<PackSummary>
    where
        S: ObjectSource,
        W: Write,
    {
        let mut stored: Vec<(ObjectId, ObjectKind, Vec<u8>)> = Vec::with_capacity(oids.len());
        for oid in oids {
            let (kind, payload) = source.read(oid)?;
            stored.push((*oid, kind, payload));
        }
        let objects: Vec<PackObject<'_>> = stored
            .iter()
            .map(|(oid, kind, payload)| PackObject::new(*oid, *kind, payload))
            .collect();
        self.write_pack(&objects, sink)
    }

    /// Selects a base and produces an acceptable delta, if any.
    fn plan_delta(
        &self,
        objects: &[PackObject<'_>],
        order: &[usize],
        depths: &[u32],
        offsets: &FxHashMap<ObjectId, u64>,
        position: usize,
    ) -> PackResult<Option<(usize, Vec<u8>)>> {
        let target = &objects[order[position]];
        let payload_len = target.payload().len();
        if payload_len < MIN_SIZE_FOR_DELTA || payload_len > self.options.max_index_bytes {
            return Ok(None);
        }

        let window_start = position.saturating_sub(CANDIDATE_WINDOW);
        let window: Vec<(&PackObject<'_>, u32)> = order[window_start..position]
            .iter()
            .map(|&index| (&objects[index], depths[index]))
            .collect();

        let Some(best) = find_best(target, &window, self.options.max_index_bytes) else {
            return Ok(None);
        };
        let base_index = order[window_start + best];
        let base = &objects[base_index];
        if !offsets.contains_key(base.oid()) {
            return Ok(None);
        }

        let index = DeltaIndex::with_limit(base.payload(), self.options.max_index_bytes)?;
        let delta_bytes = encode_with_index(&index, target.payload())?;

        if accept_delta(delta_bytes.len(), payload_len, base.payload().len()) {
            Ok(Some((base_index, delta_bytes)))
        } else {
            trace!(
                oid = %target.oid(),
                base = %base.oid(),
                raw_delta = delta_bytes.len(),
                "delta rejected, falling back to full entry"
            );
            Ok(None)
        }
    }

    fn check_cancel(&self, index: usize) -> PackResult<()> {
        if let Some(flag) = &self.options.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(PackError::Cancelled { index });
            }
        }
        Ok(())
    }
}
