#[cfg(test)]
mod tests {
    use std::{
        io::{Cursor, Write},
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    };

    use binrw::BinReaderExt;
    use flate2::{write::ZlibEncoder, Compression};
    use time::Duration;

    use crate::{
        codec::{self, stuff_ff, CodecKind, CodecParams, DecodedPlane, JpegDecoder, PlaneLayout},
        fork,
        post_process,
        reader::QtReader,
        AtomTree,
        Cmov,
        Co64,
        FourCC,
        Frame,
        LegacyDecoder,
        Movie,
        OpenOptions,
        QtError,
        SampleIndex,
        Stsc,
        Stsz,
        TrackGeometry,
    };

    const IDENTITY: [i32; 9] = [0x10000, 0, 0, 0, 0x10000, 0, 0, 0, 0x40000000];
    const SWAPPED: [i32; 9] = [0, 0x10000, 0, 0x10000, 0, 0, 0, 0, 0x40000000];

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn atom(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 8);
        out.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(payload);
        out
    }

    fn container(name: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
        atom(name, &children.concat())
    }

    /// Atom with zeroed version/flags followed by `values`.
    fn full_atom(name: &[u8; 4], values: &[u32]) -> Vec<u8> {
        let mut payload = vec![0_u8; 4];
        for v in values {
            payload.extend_from_slice(&v.to_be_bytes());
        }
        atom(name, &payload)
    }

    fn tkhd(matrix: [i32; 9], width: u32, height: u32) -> Vec<u8> {
        let mut payload = vec![0_u8; 40];
        for m in matrix {
            payload.extend_from_slice(&m.to_be_bytes());
        }
        payload.extend_from_slice(&(width << 16).to_be_bytes());
        payload.extend_from_slice(&(height << 16).to_be_bytes());
        atom(b"tkhd", &payload)
    }

    fn sample_entry(codec: &[u8; 4], width: u16, height: u16, depth: i16, fields: Option<u8>) -> Vec<u8> {
        let mut body = vec![0_u8; 6];
        body.extend_from_slice(&1_u16.to_be_bytes()); // data reference index
        body.extend_from_slice(&[0; 4]); // version, revision
        body.extend_from_slice(&[0; 12]); // vendor, temporal/spatial quality
        body.extend_from_slice(&width.to_be_bytes());
        body.extend_from_slice(&height.to_be_bytes());
        body.extend_from_slice(&0x0048_0000_u32.to_be_bytes());
        body.extend_from_slice(&0x0048_0000_u32.to_be_bytes());
        body.extend_from_slice(&[0; 4]); // data size
        body.extend_from_slice(&1_u16.to_be_bytes()); // frame count
        body.extend_from_slice(&[0; 32]); // compressor name
        body.extend_from_slice(&depth.to_be_bytes());
        body.extend_from_slice(&(-1_i16).to_be_bytes());
        if let Some(f) = fields {
            body.extend_from_slice(&atom(b"fiel", &[f, 0]));
        }
        atom(codec, &body)
    }

    /// Single track movie, `mdat` first so that chunk offsets
    /// start at byte 8. One sample per chunk.
    #[derive(Debug, Clone)]
    struct TestMovie {
        codec: [u8; 4],
        second_codec: Option<[u8; 4]>,
        depth: i16,
        fields: Option<u8>,
        matrix: [i32; 9],
        width: u32,
        height: u32,
        samples: Vec<Vec<u8>>,
        stsc: Vec<(u32, u32, u32)>,
    }

    impl TestMovie {
        fn new(codec: &[u8; 4], depth: i16, width: u32, height: u32, samples: Vec<Vec<u8>>) -> Self {
            Self {
                codec: *codec,
                second_codec: None,
                depth,
                fields: None,
                matrix: IDENTITY,
                width,
                height,
                samples,
                stsc: vec![(1, 1, 1)],
            }
        }

        fn mdat(&self) -> Vec<u8> {
            atom(b"mdat", &self.samples.concat())
        }

        fn moov(&self) -> Vec<u8> {
            let mut offset = 8_u32;
            let offsets: Vec<u32> = self.samples.iter()
                .map(|s| {
                    let o = offset;
                    offset += s.len() as u32;
                    o
                })
                .collect();
            let n = self.samples.len() as u32;

            let mut stsd = vec![0_u8; 4];
            let mut entries = vec![sample_entry(&self.codec, self.width as u16, self.height as u16, self.depth, self.fields)];
            if let Some(codec) = &self.second_codec {
                entries.push(sample_entry(codec, self.width as u16, self.height as u16, self.depth, None));
            }
            stsd.extend_from_slice(&(entries.len() as u32).to_be_bytes());
            stsd.extend_from_slice(&entries.concat());

            let stco = [vec![n], offsets].concat();
            let stsz = [vec![0, n], self.samples.iter().map(|s| s.len() as u32).collect()].concat();
            let stsc = [
                vec![self.stsc.len() as u32],
                self.stsc.iter().flat_map(|(a, b, c)| [*a, *b, *c]).collect()
            ].concat();

            container(b"moov", &[container(b"trak", &[
                tkhd(self.matrix, self.width, self.height),
                container(b"mdia", &[
                    full_atom(b"mdhd", &[0, 0, 600, 20 * n]),
                    container(b"minf", &[
                        atom(b"vmhd", &[0; 12]),
                        container(b"stbl", &[
                            atom(b"stsd", &stsd),
                            full_atom(b"stts", &[1, n, 20]),
                            full_atom(b"stsc", &stsc),
                            full_atom(b"stsz", &stsz),
                            full_atom(b"stco", &stco),
                        ]),
                    ]),
                ]),
            ])])
        }

        fn bytes(&self) -> Vec<u8> {
            [self.mdat(), self.moov()].concat()
        }

        fn open(&self) -> Movie<Cursor<Vec<u8>>> {
            Movie::from_reader(Cursor::new(self.bytes()), OpenOptions::default()).unwrap()
        }
    }

    /// Records JFIF input, returns planes filled with the call number
    /// sized from the SOF0 segment.
    #[derive(Debug, Clone, Default)]
    struct FakeJpeg {
        calls: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl JpegDecoder for FakeJpeg {
        fn decode(&self, jfif: &[u8], grayscale: bool) -> Result<DecodedPlane, QtError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(jfif.to_vec());
            let sof = jfif.windows(2)
                .position(|w| w == [0xFF, 0xC0])
                .ok_or_else(|| QtError::Jpeg("no SOF0".to_owned()))?;
            let height = u16::from_be_bytes([jfif[sof + 5], jfif[sof + 6]]) as usize;
            let width = u16::from_be_bytes([jfif[sof + 7], jfif[sof + 8]]) as usize;
            let bpp = if grayscale {1} else {3};
            Ok(DecodedPlane::interleaved(width, height, bpp, vec![calls.len() as u8; width * height * bpp]))
        }
    }

    struct FakeLegacy;

    impl LegacyDecoder for FakeLegacy {
        fn frame_count(&self, _path: &Path) -> Result<usize, QtError> {
            Ok(7)
        }

        fn open_frame(&self, _path: &Path, frame_no: usize) -> Result<Frame, QtError> {
            Ok(Frame::new(1, 1, 1, false, vec![frame_no as u8]))
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("qtplanes-{}-{name}", std::process::id()))
    }

    fn params(width: usize, height: usize, bits_per_pixel: i16) -> CodecParams {
        CodecParams {
            sample_no: 1,
            width,
            height,
            bits_per_pixel,
            interlaced: false,
            transposed: false,
        }
    }

    /// Run-length sample: chunk size, header, rows.
    fn rle_sample(header: &[u8], rows: &[&[u8]]) -> Vec<u8> {
        let body = [header, &rows.concat()].concat();
        [(body.len() as u32 + 4).to_be_bytes().to_vec(), body].concat()
    }

    fn decode(sample: &[u8], kind: CodecKind, params: &CodecParams, previous: Option<&DecodedPlane>) -> Result<DecodedPlane, QtError> {
        codec::decode(sample, &kind, params, previous, &FakeJpeg::default())
    }

    #[test]
    fn parse_is_idempotent() {
        init();
        let bytes = TestMovie::new(b"raw ", 24, 2, 2, vec![vec![0; 12]]).bytes();
        let mut reader = QtReader::new(Cursor::new(bytes.clone())).unwrap();
        let len = reader.len();
        let first = AtomTree::parse(&mut reader, 0 .. len).unwrap();
        let second = AtomTree::parse(&mut reader, 0 .. len).unwrap();
        assert_eq!(first, second);
        assert!(first.issues().is_empty());
        assert_eq!(first.atoms().len(), 2);
        assert_eq!(first.find_all(&FourCC::Trak).len(), 1);

        let a = Movie::from_reader(Cursor::new(bytes.clone()), OpenOptions::default()).unwrap();
        let b = Movie::from_reader(Cursor::new(bytes), OpenOptions::default()).unwrap();
        assert_eq!(a.atoms(), b.atoms());
        assert_eq!(a.sample_index(), b.sample_index());
    }

    #[test]
    fn structural_issue_keeps_siblings() {
        init();
        let mut bytes = atom(b"free", &[0; 4]);
        bytes.extend_from_slice(&4_u32.to_be_bytes()); // smaller than its own header
        bytes.extend_from_slice(b"junk");
        bytes.extend_from_slice(&[0; 8]);

        let mut reader = QtReader::new(Cursor::new(bytes)).unwrap();
        let len = reader.len();
        let tree = AtomTree::parse(&mut reader, 0 .. len).unwrap();
        assert_eq!(tree.atoms().len(), 1);
        assert_eq!(tree.atoms()[0].name(), &FourCC::Custom("free".to_owned()));
        assert_eq!(tree.issues().len(), 1);
        assert_eq!(tree.issues()[0].offset, 12);
    }

    #[test]
    fn oversized_child_is_clamped() {
        init();
        // 'free' claims 100 bytes inside a 24 byte 'udta'
        let mut child = atom(b"free", &[0; 8]);
        child[.. 4].copy_from_slice(&100_u32.to_be_bytes());
        let bytes = container(b"moov", &[container(b"udta", &[child])]);

        let mut reader = QtReader::new(Cursor::new(bytes)).unwrap();
        let len = reader.len();
        let tree = AtomTree::parse(&mut reader, 0 .. len).unwrap();
        let udta = tree.find(&FourCC::Udta).unwrap();
        let free = &udta.children()[0];
        assert_eq!(free.header().end(), udta.header().end());
    }

    #[test]
    fn udta_trailer_is_skipped() {
        init();
        let mut bytes = container(b"udta", &[]);
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(&atom(b"free", &[]));

        let mut reader = QtReader::new(Cursor::new(bytes)).unwrap();
        let len = reader.len();
        let tree = AtomTree::parse(&mut reader, 0 .. len).unwrap();
        assert_eq!(tree.atoms().len(), 2);
        assert_eq!(tree.atoms()[1].header().offset(), 12);
        assert!(tree.issues().is_empty());
    }

    #[test]
    fn explicit_sample_sizes() {
        init();
        let payload: Vec<u8> = [0_u32, 0, 3, 10, 20, 30].iter().flat_map(|v| v.to_be_bytes()).collect();
        let stsz: Stsz = Cursor::new(payload).read_be().unwrap();
        assert_eq!(stsz.uniform(), None);
        assert_eq!(stsz.sizes(), &[10, 20, 30]);
        assert_eq!(stsz.len(), 3);

        // Resolved through a movie
        let samples = vec![vec![1; 10], vec![2; 20], vec![3; 30]];
        let movie = TestMovie::new(b"raw ", 24, 1, 1, samples).open();
        let lens: Vec<u64> = movie.sample_index().iter().map(|r| r.len).collect();
        assert_eq!(lens, vec![10, 20, 30]);
        assert_eq!(movie.frame_count(), 3);
    }

    #[test]
    fn uniform_sample_size() {
        let stsz = Stsz::uniform_size(12, 4);
        assert_eq!(stsz.uniform(), Some(12));
        assert_eq!(stsz.size(3), Some(12));
        assert_eq!(stsz.size(4), None);
        assert!(stsz.sizes().is_empty());
    }

    #[test]
    fn secondary_count_without_second_description() {
        let stsc = Stsc::from_entries(&[(1, 1, 1), (4, 2, 1)]);
        assert_eq!(stsc.secondary_sample_count(), 0);

        // No second description: the primary codec applies to every sample
        let movie = TestMovie::new(b"raw ", 24, 1, 1, vec![vec![0; 3]; 4]).open();
        assert_eq!(movie.secondary_sample_count(), 0);
        assert!((0 .. 4).all(|no| movie.codec_for(no) == Some(CodecKind::Raw)));
    }

    #[test]
    fn secondary_count_and_codec() {
        init();
        let stsc = Stsc::from_entries(&[(1, 1, 1), (3, 1, 2)]);
        assert_eq!(stsc.secondary_sample_count(), 2);

        let mut test = TestMovie::new(b"raw ", 24, 1, 1, vec![vec![0; 3]; 4]);
        test.second_codec = Some(*b"smc ");
        test.stsc = vec![(1, 1, 1), (3, 1, 2)];
        let mut movie = test.open();

        assert_eq!(movie.secondary_sample_count(), 2);
        assert_eq!(movie.codec_for(1), Some(CodecKind::Raw));
        assert_eq!(movie.codec_for(2), Some(CodecKind::Unsupported(FourCC::from_str("smc "))));
        assert!(movie.open_frame(1).is_ok());
        assert!(matches!(movie.open_frame(3), Err(QtError::UnsupportedCodec(f)) if f.to_str() == "smc "));
    }

    #[test]
    fn sample_bounds_in_order() {
        let index = SampleIndex::new(
            &Co64::from_offsets(&[100, 120, 140]),
            Some(&Stsz::explicit(&[20, 20, 60])),
            None,
            None,
            200
        );
        assert_eq!(index.scale(), 100);
        assert_eq!(index.pixel_bytes(), 100);
        let r0 = index.get(0).unwrap();
        assert_eq!((r0.offset, r0.len), (0, 20));
        let r2 = index.get(2).unwrap();
        assert_eq!((r2.offset, r2.len), (40, 60));
        assert!(index.get(3).is_none());
    }

    #[test]
    fn sample_bounds_swapped() {
        let index = SampleIndex::new(
            &Co64::from_offsets(&[100, 140, 120]),
            Some(&Stsz::explicit(&[20, 20, 20])),
            None,
            None,
            200
        );
        // Next offset precedes this one: bounds are swapped
        let r1 = index.get(1).unwrap();
        assert_eq!((r1.offset, r1.len), (20, 20));
        let r0 = index.get(0).unwrap();
        assert_eq!((r0.offset, r0.len), (0, 40));
    }

    #[test]
    fn chunks_expanded_via_stsc() {
        init();
        let index = SampleIndex::new(
            &Co64::from_offsets(&[100, 200]),
            Some(&Stsz::uniform_size(10, 4)),
            Some(&Stsc::from_entries(&[(1, 2, 1)])),
            None,
            300
        );
        assert_eq!(index.offsets(), &[100, 110, 200, 210]);
    }

    #[test]
    fn offsets_extrapolated_from_first_chunk() {
        init();
        let index = SampleIndex::new(
            &Co64::from_offsets(&[100]),
            Some(&Stsz::explicit(&[10, 20, 30])),
            None,
            None,
            300
        );
        assert_eq!(index.offsets(), &[100, 110, 130]);
    }

    #[test]
    fn rle_full_frame_without_cache() {
        init();
        let sample = rle_sample(&[0x00, 0x00], &[
            &[1, 2, 1, 2, 3, 4, 5, 6, 0xFF],
            &[1, 0xFE, 7, 8, 9, 0xFF], // one pixel repeated twice
        ]);
        let plane = decode(&sample, CodecKind::Rle, &params(2, 2, 24), None).unwrap();
        assert_eq!(plane.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 7, 8, 9]);
        assert_eq!(plane.bytes_per_pixel(), 3);
    }

    #[test]
    fn rle_partial_frame_keeps_untouched_rows() {
        init();
        let previous = DecodedPlane::interleaved(2, 3, 3, vec![7; 18]);
        let sample = rle_sample(&[0x00, 0x08, 0, 1, 0, 0, 0, 1, 0, 0], &[
            &[1, 1, 9, 9, 9, 0xFF],
        ]);
        let plane = decode(&sample, CodecKind::Rle, &params(2, 3, 24), Some(&previous)).unwrap();
        assert_eq!(&plane.bytes()[.. 6], &previous.bytes()[.. 6]);
        assert_eq!(&plane.bytes()[6 .. 12], &[9, 9, 9, 7, 7, 7]);
        assert_eq!(&plane.bytes()[12 ..], &previous.bytes()[12 ..]);
    }

    #[test]
    fn rle_skip_codes_copy_previous() {
        let previous = DecodedPlane::interleaved(3, 1, 3, vec![5; 9]);
        // Skip code 2 moves one pixel right
        let sample = rle_sample(&[0x00, 0x00], &[&[1, 0, 2, 1, 1, 2, 3, 0xFF]]);
        let plane = decode(&sample, CodecKind::Rle, &params(3, 1, 24), Some(&previous)).unwrap();
        assert_eq!(plane.bytes(), &[5, 5, 5, 1, 2, 3, 5, 5, 5]);
    }

    #[test]
    fn rle_partial_frame_without_cache() {
        let sample = rle_sample(&[0x00, 0x08, 0, 1, 0, 0, 0, 1, 0, 0], &[&[1, 1, 9, 9, 9, 0xFF]]);
        let result = decode(&sample, CodecKind::Rle, &params(2, 3, 24), None);
        assert!(matches!(result, Err(QtError::MissingPreviousFrame(1))));
    }

    #[test]
    fn rle_unknown_header() {
        let sample = rle_sample(&[0x00, 0x04], &[&[1, 0xFF]]);
        let result = decode(&sample, CodecKind::Rle, &params(1, 1, 24), None);
        assert!(matches!(result, Err(QtError::UnsupportedHeader(0x0004))));
    }

    #[test]
    fn rle_short_sample_repeats_previous() {
        let previous = DecodedPlane::interleaved(1, 1, 3, vec![1, 2, 3]);
        let sample = [0, 0, 0, 6, 0, 0];
        let plane = decode(&sample, CodecKind::Rle, &params(1, 1, 24), Some(&previous)).unwrap();
        assert_eq!(plane, previous);
        assert!(matches!(
            decode(&sample, CodecKind::Rle, &params(1, 1, 24), None),
            Err(QtError::MissingPreviousFrame(_))
        ));
    }

    #[test]
    fn rle_truncated_stream() {
        init();
        // Full frame header, 3 rows, only the first one present
        let sample = rle_sample(&[0x00, 0x00], &[&[1, 1, 9, 9, 9, 0xFF]]);
        let result = decode(&sample, CodecKind::Rle, &params(1, 3, 24), None);
        assert!(matches!(result, Err(QtError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof));

        // Missing rows are not filled from the previous frame either
        let previous = DecodedPlane::interleaved(1, 3, 3, vec![7; 9]);
        let result = decode(&sample, CodecKind::Rle, &params(1, 3, 24), Some(&previous));
        assert!(matches!(result, Err(QtError::Io(_))));
    }

    #[test]
    fn rle_effective_bpp() {
        assert_eq!(codec::effective_bpp(8), 3);
        assert_eq!(codec::effective_bpp(16), 3);
        assert_eq!(codec::effective_bpp(24), 3);
        assert_eq!(codec::effective_bpp(32), 4);
        assert_eq!(codec::effective_bpp(40), 1);
    }

    #[test]
    fn rle_sequential_frames_in_movie() {
        init();
        let frame0 = rle_sample(&[0x00, 0x00], &[
            &[1, 2, 1, 1, 1, 2, 2, 2, 0xFF],
            &[1, 2, 3, 3, 3, 4, 4, 4, 0xFF],
        ]);
        let frame1 = rle_sample(&[0x00, 0x08, 0, 1, 0, 0, 0, 1, 0, 0], &[&[1, 1, 9, 9, 9, 0xFF]]);
        let test = TestMovie::new(b"rle ", 24, 2, 2, vec![frame0, frame1]);

        let mut movie = test.open();
        assert_eq!(movie.open_frame(0).unwrap().pixels(), &[1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4]);
        assert_eq!(movie.open_frame(1).unwrap().pixels(), &[1, 1, 1, 2, 2, 2, 9, 9, 9, 4, 4, 4]);
        // Same frame again reuses the cached plane
        assert_eq!(movie.open_frame(1).unwrap().pixels(), &[1, 1, 1, 2, 2, 2, 9, 9, 9, 4, 4, 4]);

        // Out of order access
        let mut movie = test.open();
        assert!(matches!(movie.open_frame(1), Err(QtError::MissingPreviousFrame(1))));
    }

    #[test]
    fn rpza_fill_with_color_zero() {
        init();
        // Marker, 24-bit chunk length, one 0xA0 fill of 4 blocks with color 0
        let sample = [0xE1, 0x00, 0x00, 0x07, 0xA3, 0x00, 0x00];
        let plane = decode(&sample, CodecKind::Rpza, &params(8, 8, 8), None).unwrap();
        assert_eq!(plane.layout(), PlaneLayout::Planar);
        assert_eq!(plane.len(), 8 * 8 * 3);
        // 0xFFFF - 0 => 5-bit 31 per channel => 255
        assert!(plane.bytes().iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn rpza_direct_color_block() {
        // Direct color 0x7C00 (red 31), next byte high bit clear:
        // 16 colors, the direct color first
        let mut sample = vec![0xE1, 0x00, 0x00, 0x00, 0x7C, 0x00];
        sample.extend_from_slice(&[0; 30]);
        let len = sample.len() as u32;
        sample[1 .. 4].copy_from_slice(&len.to_be_bytes()[1 ..]);

        let plane = decode(&sample, CodecKind::Rpza, &params(4, 4, 8), None).unwrap();
        let (r, g, b) = (&plane.bytes()[.. 16], &plane.bytes()[16 .. 32], &plane.bytes()[32 ..]);
        assert_eq!((r[0], g[0], b[0]), (0, 255, 255));
        assert!(r[1 ..].iter().all(|v| *v == 255));
    }

    #[test]
    fn rpza_palette_block() {
        // One 0xC0 block: A = 0x7FFF, B = 0x0000, indices 3 (A) and 0 (B)
        let sample = [
            0xE1, 0x00, 0x00, 0x0D,
            0xC0, 0x7F, 0xFF, 0x00, 0x00,
            0xFF, 0x00, 0xFF, 0x00,
        ];
        let plane = decode(&sample, CodecKind::Rpza, &params(4, 4, 8), None).unwrap();
        let r = &plane.bytes()[.. 16];
        // Color A (white) inverts to 0, color B (black) to 255
        assert_eq!(&r[.. 4], &[0, 0, 0, 0]);
        assert_eq!(&r[4 .. 8], &[255, 255, 255, 255]);
    }

    #[test]
    fn rpza_skip_then_fill() {
        // Three blocks in a row: skip two, fill the third with 0x7FFF
        let sample = [0xE1, 0x00, 0x00, 0x08, 0x81, 0xA0, 0x7F, 0xFF];
        let plane = decode(&sample, CodecKind::Rpza, &params(12, 4, 8), None).unwrap();
        let r = &plane.bytes()[.. 48];
        for row in r.chunks(12) {
            // Skipped blocks keep color 0
            assert!(row[.. 8].iter().all(|v| *v == 255));
            assert!(row[8 ..].iter().all(|v| *v == 0));
        }
    }

    #[test]
    fn rpza_direct_color_palette_block() {
        // Direct color A = 0x7C00, next byte has its high bit set:
        // color B = 0x8000 and four index bytes follow (rows A, B, A, B),
        // then a fill of the second block with 0x03E0
        let sample = [
            0xE1, 0x00, 0x00, 0x0F,
            0x7C, 0x00,
            0x80, 0x00,
            0xFF, 0x00, 0xFF, 0x00,
            0xA0, 0x03, 0xE0,
        ];
        let plane = decode(&sample, CodecKind::Rpza, &params(4, 8, 8), None).unwrap();
        let (r, g) = (&plane.bytes()[.. 32], &plane.bytes()[32 .. 64]);

        // Row 0: color A, red 31 inverts to 0
        assert_eq!((r[0], g[0]), (0, 255));
        // Row 1: color B, all channels invert to 255
        assert_eq!((r[4], g[4]), (255, 255));
        assert_eq!((r[8], r[12]), (0, 255));
        // Second block: filled after exactly 2 + 4 bytes were consumed
        assert!(r[16 ..].iter().all(|v| *v == 255));
        assert!(g[16 ..].iter().all(|v| *v == 0));
    }

    #[test]
    fn stuffing_without_ff_is_noop() {
        let payload = [0x00, 0x12, 0xFE, 0x7F, 0x01];
        assert_eq!(stuff_ff(&payload), payload.to_vec());
        assert_eq!(stuff_ff(&stuff_ff(&payload)), payload.to_vec());
        assert_eq!(stuff_ff(&[0xFF, 0x01, 0xFF]), vec![0xFF, 0x00, 0x01, 0xFF, 0x00]);
    }

    fn mjpb_field(next_field: u32, payload: &[u8]) -> Vec<u8> {
        let size = 40 + payload.len() as u32;
        let mut out = vec![0_u8; 4];
        out.extend_from_slice(b"mjpg");
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(&next_field.to_be_bytes());
        out.extend_from_slice(&[0; 16]); // quant, huffman, sof, sos
        out.extend_from_slice(&40_u32.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn mjpb_single_field_jfif() {
        init();
        let jpeg = FakeJpeg::default();
        // 16 byte prefix before the field
        let sample = [vec![0; 16], mjpb_field(0, &[0x12, 0xFF, 0x34])].concat();
        let plane = codec::decode(&sample, &CodecKind::InterlacedJpeg, &params(8, 6, 24), None, &jpeg).unwrap();
        assert_eq!((plane.width(), plane.height()), (8, 6));

        let calls = jpeg.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let jfif = &calls[0];
        assert_eq!(&jfif[.. 4], &[0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(&jfif[6 .. 11], b"JFIF\0");
        assert!(jfif.ends_with(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD9]));
        // Two DQT segments, one DHT segment
        assert_eq!(jfif.windows(4).filter(|w| *w == [0xFF, 0xDB, 0x00, 67]).count(), 2);
        assert_eq!(jfif.windows(2).filter(|w| *w == [0xFF, 0xC4]).count(), 1);
        // Three components, full height
        let sof = jfif.windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
        assert_eq!(&jfif[sof + 5 .. sof + 10], &[0, 6, 0, 8, 3]);
    }

    #[test]
    fn mjpb_grayscale_has_one_component() {
        let jpeg = FakeJpeg::default();
        let sample = mjpb_field(0, &[0x01]);
        let plane = codec::decode(&sample, &CodecKind::InterlacedJpeg, &params(4, 4, 40), None, &jpeg).unwrap();
        assert_eq!(plane.bytes_per_pixel(), 1);
        let calls = jpeg.calls.lock().unwrap();
        let sof = calls[0].windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
        assert_eq!(calls[0][sof + 9], 1);
    }

    #[test]
    fn mjpb_fields_interleaved() {
        init();
        let field1 = mjpb_field(43, &[1, 2, 3]);
        assert_eq!(field1.len(), 43);
        let sample = [field1, mjpb_field(0, &[4, 5, 6])].concat();

        let mut p = params(2, 4, 24);
        p.interlaced = true;

        let jpeg = FakeJpeg::default();
        let plane = codec::decode(&sample, &CodecKind::InterlacedJpeg, &p, None, &jpeg).unwrap();
        assert_eq!(plane.height(), 4);
        let rows: Vec<u8> = plane.bytes().chunks(6).map(|r| r[0]).collect();
        assert_eq!(rows, vec![1, 2, 1, 2]);

        // Each field is half height, and carries only its own payload
        let calls = jpeg.calls.lock().unwrap();
        for (call, payload) in calls.iter().zip([[1, 2, 3], [4, 5, 6]]) {
            let sof = call.windows(2).position(|w| w == [0xFF, 0xC0]).unwrap();
            assert_eq!(&call[sof + 5 .. sof + 7], &[0, 2]);
            assert!(call.ends_with(&[payload[0], payload[1], payload[2], 0xFF, 0xD9]));
        }
        drop(calls);

        // Transposed: second field on even lines
        p.transposed = true;
        let plane = codec::decode(&sample, &CodecKind::InterlacedJpeg, &p, None, &FakeJpeg::default()).unwrap();
        let rows: Vec<u8> = plane.bytes().chunks(6).map(|r| r[0]).collect();
        assert_eq!(rows, vec![2, 1, 2, 1]);
    }

    #[test]
    fn mjpb_missing_header() {
        let result = decode(&[0; 64], CodecKind::InterlacedJpeg, &params(2, 2, 24), None);
        assert!(matches!(result, Err(QtError::Corrupt(_))));
    }

    #[test]
    fn jpeg_prefix_is_stripped() {
        let jpeg = FakeJpeg::default();
        let jfif = [0xFF, 0xD8, 0xFF, 0xC0, 0, 11, 8, 0, 1, 0, 1, 1, 1, 0x11, 0, 0xFF, 0xD9];
        let sample = [vec![0xAA; 16], jfif.to_vec()].concat();
        let plane = codec::decode(&sample, &CodecKind::Jpeg, &params(1, 1, 40), None, &jpeg).unwrap();
        assert_eq!(plane.len(), 1);
        assert_eq!(jpeg.calls.lock().unwrap()[0], jfif.to_vec());
    }

    #[test]
    fn transposed_geometry_swaps_output() {
        init();
        let mut test = TestMovie::new(b"raw ", 24, 3, 2, vec![(0 .. 18).collect()]);
        test.matrix = SWAPPED;
        let mut movie = test.open();

        assert!(movie.geometry().transposed());
        assert_eq!((movie.geometry().declared_width(), movie.geometry().declared_height()), (3, 2));
        assert_eq!(movie.geometry().output_size(), (2, 3));

        let frame = movie.open_frame(0).unwrap();
        assert_eq!((frame.width(), frame.height()), (2, 3));
        assert_eq!(&frame.pixels()[.. 6], &[0, 1, 2, 9, 10, 11]);
        assert_eq!(&frame.pixels()[6 .. 12], &[3, 4, 5, 12, 13, 14]);
    }

    #[test]
    fn identity_geometry() {
        let geometry = TrackGeometry::new([1, 0, 0, 0, 1, 0, 0, 0, 0x4000], 320, 240);
        assert!(!geometry.transposed());
        assert_eq!(geometry.output_size(), (320, 240));
    }

    #[test]
    fn post_process_pad_and_invert() {
        // 3 pixels wide, one pad byte per row
        let plane = DecodedPlane::interleaved(3, 2, 1, vec![0, 1, 2, 99, 3, 4, 5, 99]);
        let frame = post_process(&plane, &CodecKind::Raw, &TrackGeometry::default(), 8).unwrap();
        assert_eq!(frame.pixels(), &[255, 254, 253, 252, 251, 250]);

        // No inversion for 24-bit, no padding when sizes match
        let plane = DecodedPlane::interleaved(2, 1, 3, vec![1, 2, 3, 4, 5, 6]);
        let frame = post_process(&plane, &CodecKind::Raw, &TrackGeometry::default(), 24).unwrap();
        assert_eq!(frame.pixels(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn post_process_strips_alpha() {
        let plane = DecodedPlane::interleaved(2, 1, 4, vec![0, 1, 2, 3, 0, 4, 5, 6]);
        let frame = post_process(&plane, &CodecKind::Raw, &TrackGeometry::default(), 32).unwrap();
        assert_eq!(frame.bytes_per_pixel(), 3);
        assert_eq!(frame.pixels(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn post_process_transposes() {
        let geometry = TrackGeometry::new([0, 1, 0, 1, 0, 0, 0, 0, 1], 3, 2);
        let plane = DecodedPlane::interleaved(3, 2, 1, vec![1, 2, 3, 4, 5, 6]);
        let frame = post_process(&plane, &CodecKind::Raw, &geometry, 16).unwrap();
        assert_eq!((frame.width(), frame.height()), (2, 3));
        assert_eq!(frame.pixels(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn post_process_short_plane() {
        let plane = DecodedPlane::interleaved(2, 2, 3, vec![0; 5]);
        let result = post_process(&plane, &CodecKind::Raw, &TrackGeometry::default(), 24);
        assert!(matches!(result, Err(QtError::ShortPlane{got: 5, expected: 12})));
    }

    #[test]
    fn buffer_size_checked_first() {
        init();
        let mut movie = TestMovie::new(b"raw ", 24, 2, 2, vec![vec![0; 12]]).open();
        assert_eq!(movie.frame_len(0), Some(12));

        let mut small = [0_u8; 4];
        let result = movie.open_frame_into(0, &mut small);
        assert!(matches!(result, Err(QtError::BufferSize{got: 4, expected: 12})));

        let mut buf = [0xAA_u8; 16];
        assert_eq!(movie.open_frame_into(0, &mut buf).unwrap(), 12);
        assert_eq!(&buf[12 ..], &[0xAA; 4]);
    }

    #[test]
    fn invalid_frame_number() {
        let mut movie = TestMovie::new(b"raw ", 24, 1, 1, vec![vec![0; 3]]).open();
        assert!(matches!(movie.open_frame(1), Err(QtError::InvalidFrame{no: 1, count: 1})));
    }

    #[test]
    fn frame_duration_from_media_header() {
        let movie = TestMovie::new(b"raw ", 24, 1, 1, vec![vec![0; 3]; 2]).open();
        assert_eq!(movie.frame_duration(), Some(Duration::seconds_f64(20.0 / 600.0)));
        let track = movie.track().unwrap();
        assert_eq!(track.mdhd().unwrap().time_scale(), 600);
        assert!(track.is_video());
    }

    #[test]
    fn stsd_fields_and_depth() {
        let mut test = TestMovie::new(b"mjpb", 24, 2, 2, vec![vec![0; 3]]);
        test.fields = Some(2);
        let movie = test.open();
        let description = movie.description().unwrap();
        assert_eq!(description.primary_codec(), &FourCC::Mjpb);
        assert_eq!(description.bits_per_pixel(), 24);
        assert!(description.interlaced());
        let track = movie.track().unwrap();
        assert_eq!(track.stsd().unwrap().no_of_entries(), 1);
        assert_eq!(track.stsc().unwrap().no_of_entries(), 1);

        // rpza is always 8-bit
        let movie = TestMovie::new(b"rpza", 16, 4, 4, vec![vec![0; 3]]).open();
        assert_eq!(movie.description().unwrap().bits_per_pixel(), 8);
    }

    #[test]
    fn compressed_movie_header() {
        init();
        let test = TestMovie::new(b"raw ", 24, 2, 1, vec![vec![1, 2, 3, 4, 5, 6]]);
        let moov = test.moov();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&moov).unwrap();
        let compressed = encoder.finish().unwrap();

        let cmvd = [(moov.len() as u32).to_be_bytes().to_vec(), compressed].concat();
        let cmov = container(b"cmov", &[atom(b"dcom", b"zlib"), atom(b"cmvd", &cmvd)]);
        let bytes = [test.mdat(), container(b"moov", &[cmov])].concat();

        let mut movie = Movie::from_reader(Cursor::new(bytes), OpenOptions::default()).unwrap();
        assert_eq!(movie.frame_count(), 1);
        assert_eq!(movie.open_frame(0).unwrap().pixels(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn inflate_ignores_bogus_declared_size() {
        let moov = container(b"moov", &[]);
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&moov).unwrap();
        let compressed = encoder.finish().unwrap();

        // Declared uncompressed size of 4 GiB
        let cmvd = [u32::MAX.to_be_bytes().to_vec(), compressed].concat();
        let payload = [atom(b"dcom", b"zlib"), atom(b"cmvd", &cmvd)].concat();
        let cmov = Cmov::parse(&payload).unwrap();
        assert_eq!(cmov.inflate().unwrap(), moov);
    }

    #[test]
    fn unknown_compression_is_an_error() {
        let test = TestMovie::new(b"raw ", 24, 1, 1, vec![vec![0; 3]]);
        let cmov = container(b"cmov", &[atom(b"dcom", b"lzss"), atom(b"cmvd", &[0; 8])]);
        let bytes = [test.mdat(), container(b"moov", &[cmov])].concat();
        let result = Movie::from_reader(Cursor::new(bytes), OpenOptions::default());
        assert!(matches!(result, Err(QtError::CompressedHeader(_))));
    }

    #[test]
    fn unsupported_codec_without_legacy_decoder() {
        let mut movie = TestMovie::new(b"cvid", 24, 1, 1, vec![vec![0; 3]]).open();
        assert!(!movie.is_legacy());
        assert_eq!(movie.frame_len(0), None);
        assert!(matches!(movie.open_frame(0), Err(QtError::UnsupportedCodec(_))));
    }

    #[test]
    fn unsupported_codec_delegated() {
        init();
        let path = temp_path("legacy.mov");
        std::fs::write(&path, TestMovie::new(b"cvid", 24, 1, 1, vec![vec![0; 3]]).bytes()).unwrap();

        let options = OpenOptions::default().legacy_decoder(FakeLegacy);
        let mut movie = Movie::with_options(&path, options).unwrap();
        assert!(movie.is_legacy());
        assert_eq!(movie.frame_count(), 7);
        assert_eq!(movie.open_frame(3).unwrap().pixels(), &[3]);

        // Forced, even for a natively supported codec
        std::fs::write(&path, TestMovie::new(b"raw ", 24, 1, 1, vec![vec![0; 3]]).bytes()).unwrap();
        let options = OpenOptions::default().legacy_decoder(FakeLegacy).force_legacy(true);
        let movie = Movie::with_options(&path, options).unwrap();
        assert!(movie.is_legacy());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn separated_resource_fork() {
        init();
        let test = TestMovie::new(b"raw ", 24, 1, 1, vec![vec![7, 8, 9]]);
        let path = temp_path("fork.mov");
        let fork_path = path.with_extension("qtr");
        std::fs::write(&path, test.mdat()).unwrap();

        // Fork missing
        assert!(matches!(Movie::new(&path), Err(QtError::ResourceForkNotFound(_))));

        std::fs::write(&fork_path, [b"resource map".to_vec(), test.moov()].concat()).unwrap();
        let mut movie = Movie::new(&path).unwrap();
        assert_eq!(movie.frame_count(), 1);
        assert_eq!(movie.open_frame(0).unwrap().pixels(), &[7, 8, 9]);

        std::fs::remove_file(&path).unwrap();
        std::fs::remove_file(&fork_path).unwrap();
    }

    #[test]
    fn resource_fork_behind_stub_header() {
        init();
        let test = TestMovie::new(b"raw ", 24, 1, 1, vec![vec![4, 5, 6]]);
        let path = temp_path("stub.mov");
        let fork_path = path.with_extension("qtr");

        // Data fork 'moov' with a track header, but no sample tables
        let stub = container(b"moov", &[container(b"trak", &[tkhd(IDENTITY, 1, 1)])]);
        std::fs::write(&path, [test.mdat(), stub].concat()).unwrap();
        std::fs::write(&fork_path, [b"resource map".to_vec(), test.moov()].concat()).unwrap();

        let mut movie = Movie::new(&path).unwrap();
        assert_eq!(movie.frame_count(), 1);
        assert_eq!(movie.open_frame(0).unwrap().pixels(), &[4, 5, 6]);

        // Without the fork search, no track has samples
        let options = OpenOptions::default().search_resource_fork(false);
        assert!(matches!(Movie::with_options(&path, options), Err(QtError::NoVideoTrack)));

        std::fs::remove_file(&path).unwrap();
        std::fs::remove_file(&fork_path).unwrap();
    }

    #[test]
    fn resource_fork_lookup() {
        let candidates = fork::resource_fork_candidates(Path::new("/movies/clip.mov"));
        assert_eq!(candidates, vec![
            PathBuf::from("/movies/clip.qtr"),
            PathBuf::from("/movies/._clip.mov"),
            PathBuf::from("/movies/clip.mov/..namedfork/rsrc"),
        ]);
        assert_eq!(fork::moov_offset(b"abcd\x00\x00\x00\x08moov"), Some(4));
        assert_eq!(fork::moov_offset(b"mdat"), None);
    }
}
