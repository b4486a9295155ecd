//! Per-instance vertex streams built from a traversal, grouped by bucket so
//! that each bucket is one contiguous instanced draw.

use std::ops::Range;

use super::traversal::{TraversalOutput, NUM_STREAMS};

/// Upload buffers grow in steps of this many bytes
pub const BUFFER_GRANULARITY: usize = 4096;

const INSTANCE_STREAM_STRIDE: usize = std::mem::size_of::<[f32; 4]>();

/// Bytes needed for `instance_count` records of one stream, rounded up to
/// the buffer granularity.
pub fn padded_stream_size(instance_count: usize) -> usize {
    (instance_count * INSTANCE_STREAM_STRIDE).div_ceil(BUFFER_GRANULARITY) * BUFFER_GRANULARITY
}

/// Instance data split into streams, bucket-contiguous
#[derive(Clone, Debug, Default)]
pub struct InstanceBuffers {
    streams: Vec<Vec<[f32; 4]>>,
    bucket_ranges: Vec<Range<u32>>,
    instance_count: u32,
}

impl InstanceBuffers {
    /// Scatter a traversal's staged instances into their buckets.
    ///
    /// Two streams (position/LOD) are always produced; the third one (hit
    /// proxy color and selection) only `with_selection`.
    pub fn from_output(output: &TraversalOutput, with_selection: bool) -> Self {
        let stream_count = if with_selection { NUM_STREAMS } else { NUM_STREAMS - 1 };

        let mut bucket_ranges = Vec::with_capacity(output.bucket_instance_counts.len());
        let mut offset = 0u32;
        for &count in &output.bucket_instance_counts {
            bucket_ranges.push(offset..offset + count);
            offset += count;
        }
        debug_assert_eq!(offset, output.instance_count);

        let len = offset as usize;
        let capacity = padded_stream_size(len) / INSTANCE_STREAM_STRIDE;
        let mut streams: Vec<Vec<[f32; 4]>> = (0..stream_count)
            .map(|_| {
                let mut stream = Vec::with_capacity(capacity);
                stream.resize(len, [0.0; 4]);
                stream
            })
            .collect();

        let mut cursors: Vec<u32> = bucket_ranges.iter().map(|range| range.start).collect();
        for staged in &output.staging_instance_data {
            let cursor = &mut cursors[staged.bucket_index as usize];
            for (stream, data) in streams.iter_mut().zip(staged.data.iter()) {
                stream[*cursor as usize] = *data;
            }
            *cursor += 1;
        }

        log::trace!(
            "Instance buffers: {} instances, {} buckets, {} streams",
            offset,
            bucket_ranges.len(),
            stream_count
        );

        Self {
            streams,
            bucket_ranges,
            instance_count: offset,
        }
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Instance range of every bucket, in bucket order
    pub fn bucket_ranges(&self) -> &[Range<u32>] {
        &self.bucket_ranges
    }

    /// Buckets that have at least one instance, for issuing draws
    pub fn non_empty_buckets(&self) -> impl Iterator<Item = (usize, Range<u32>)> + '_ {
        self.bucket_ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| !range.is_empty())
            .map(|(bucket, range)| (bucket, range.clone()))
    }

    pub fn stream(&self, index: usize) -> &[[f32; 4]] {
        &self.streams[index]
    }

    /// Raw bytes of one stream, ready for upload
    pub fn stream_bytes(&self, index: usize) -> &[u8] {
        bytemuck::cast_slice(&self.streams[index])
    }

    /// Size in bytes a GPU buffer for one stream should be allocated with
    pub fn buffer_size(&self) -> usize {
        padded_stream_size(self.instance_count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::traversal::StagingInstanceData;

    fn staged(bucket_index: u32, tag: f32) -> StagingInstanceData {
        StagingInstanceData {
            bucket_index,
            data: [[tag, 0.0, 0.0, 0.0], [0.0, tag, 0.0, 0.0], [0.0, 0.0, tag, 1.0]],
        }
    }

    fn output() -> TraversalOutput {
        TraversalOutput {
            bucket_instance_counts: vec![2, 0, 1, 2],
            staging_instance_data: vec![
                staged(3, 1.0),
                staged(0, 2.0),
                staged(2, 3.0),
                staged(0, 4.0),
                staged(3, 5.0),
            ],
            instance_count: 5,
        }
    }

    #[test]
    fn test_bucket_ranges_are_prefix_sums() {
        let buffers = InstanceBuffers::from_output(&output(), false);
        assert_eq!(buffers.bucket_ranges(), &[0..2, 2..2, 2..3, 3..5]);
        assert_eq!(buffers.instance_count(), 5);
        let drawn: Vec<usize> = buffers.non_empty_buckets().map(|(bucket, _)| bucket).collect();
        assert_eq!(drawn, vec![0, 2, 3]);
    }

    #[test]
    fn test_scatter_keeps_traversal_order_within_bucket() {
        let buffers = InstanceBuffers::from_output(&output(), false);
        let tags: Vec<f32> = buffers.stream(0).iter().map(|d| d[0]).collect();
        assert_eq!(tags, vec![2.0, 4.0, 3.0, 1.0, 5.0]);
        let tags: Vec<f32> = buffers.stream(1).iter().map(|d| d[1]).collect();
        assert_eq!(tags, vec![2.0, 4.0, 3.0, 1.0, 5.0]);
    }

    #[test]
    fn test_selection_stream_is_optional() {
        assert_eq!(InstanceBuffers::from_output(&output(), false).stream_count(), 2);

        let buffers = InstanceBuffers::from_output(&output(), true);
        assert_eq!(buffers.stream_count(), 3);
        assert_eq!(buffers.stream(2)[0], [0.0, 0.0, 2.0, 1.0]);
    }

    #[test]
    fn test_stream_bytes_and_padding() {
        let buffers = InstanceBuffers::from_output(&output(), false);
        assert_eq!(buffers.stream_bytes(0).len(), 5 * 16);
        assert_eq!(buffers.buffer_size(), BUFFER_GRANULARITY);

        assert_eq!(padded_stream_size(0), 0);
        assert_eq!(padded_stream_size(256), 4096);
        assert_eq!(padded_stream_size(257), 8192);
    }

    #[test]
    fn test_empty_output() {
        let buffers = InstanceBuffers::from_output(&TraversalOutput::default(), true);
        assert_eq!(buffers.instance_count(), 0);
        assert!(buffers.bucket_ranges().is_empty());
        assert!(buffers.stream(0).is_empty());
    }
}
