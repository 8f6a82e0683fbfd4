// document-synthesis-service/src/renderers/cjk.rs

use std::path::Path;
use std::sync::Arc;

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo};
use pdf_writer::{Filter, Finish, Name, Pdf, Rect as PdfRect, Ref, Str};
use tracing::{debug, info};

use crate::error::{DocumentError, Result};

/// Resource name of the composite font in every page's font dictionary.
pub(crate) const RESOURCE: Name<'static> = Name(b"F4");

const PREDEFINED_BASE_FONT: &[u8] = b"STSong-Light";

// Wide runs are UTF-16BE code units, so the code is the Unicode value.
const IDENTITY_TO_UNICODE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0000> <FFFF> <0000>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Font used for text the builtin Helvetica family cannot encode.
///
/// `Predefined` names the Adobe-GB1 `STSong-Light` font through the
/// `UniGB-UCS2-H` CMap; viewers supply the glyphs. `Embedded` carries a
/// TrueType program set through `Identity-H` with a CID to glyph map.
#[derive(Clone, Default)]
pub enum CjkFont {
    #[default]
    Predefined,
    Embedded(Arc<EmbeddedFont>),
}

pub struct EmbeddedFont {
    name: String,
    program: Vec<u8>,
    program_len: usize,
    cid_to_gid: Vec<u8>,
    bbox: [f32; 4],
    ascent: f32,
    descent: f32,
    cap_height: f32,
}

impl CjkFont {
    /// Reads a TrueType file. Collections (`.ttc`) cannot go into `FontFile2`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("CJKFont")
            .to_string();
        let font = Self::from_truetype(&name, data)?;
        info!(path = %path.display(), "CJK font loaded");
        Ok(font)
    }

    pub fn from_truetype(name: &str, data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| DocumentError::FontError(format!("{name}: {e}")))?;

        // One big-endian glyph id per BMP code unit.
        let mut cid_to_gid = vec![0u8; 0x10000 * 2];
        let mut mapped = 0usize;
        for unit in 0u32..=0xFFFF {
            let glyph = char::from_u32(unit).and_then(|c| face.glyph_index(c));
            if let Some(glyph) = glyph {
                let offset = unit as usize * 2;
                cid_to_gid[offset..offset + 2].copy_from_slice(&glyph.0.to_be_bytes());
                mapped += 1;
            }
        }
        if face.glyph_index('中').is_none() {
            return Err(DocumentError::FontError(format!("{name}: no CJK glyphs")));
        }

        let scale = 1000.0 / f32::from(face.units_per_em());
        let bounds = face.global_bounding_box();
        let font = EmbeddedFont {
            name: postscript_name(name),
            program_len: data.len(),
            program: compress_to_vec_zlib(&data, 6),
            cid_to_gid: compress_to_vec_zlib(&cid_to_gid, 6),
            bbox: [
                f32::from(bounds.x_min) * scale,
                f32::from(bounds.y_min) * scale,
                f32::from(bounds.x_max) * scale,
                f32::from(bounds.y_max) * scale,
            ],
            ascent: f32::from(face.ascender()) * scale,
            descent: f32::from(face.descender()) * scale,
            cap_height: f32::from(face.capital_height().unwrap_or(face.ascender())) * scale,
        };
        debug!(font = %font.name, mapped, "CJK glyph map built");
        Ok(Self::Embedded(Arc::new(font)))
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }

    /// Writes the Type0 font and its descendants; `alloc` hands out object ids.
    pub(crate) fn write(&self, pdf: &mut Pdf, font_id: Ref, alloc: &mut impl FnMut() -> Ref) {
        let cid_font_id = alloc();
        let descriptor_id = alloc();
        let to_unicode_id = alloc();

        pdf.stream(to_unicode_id, IDENTITY_TO_UNICODE);

        match self {
            Self::Predefined => {
                pdf.type0_font(font_id)
                    .base_font(Name(PREDEFINED_BASE_FONT))
                    .encoding_predefined(Name(b"UniGB-UCS2-H"))
                    .descendant_font(cid_font_id)
                    .to_unicode(to_unicode_id);
                pdf.cid_font(cid_font_id)
                    .subtype(CidFontType::Type0)
                    .base_font(Name(PREDEFINED_BASE_FONT))
                    .system_info(SystemInfo {
                        registry: Str(b"Adobe"),
                        ordering: Str(b"GB1"),
                        supplement: 4,
                    })
                    .font_descriptor(descriptor_id)
                    .default_width(1000.0);
                pdf.font_descriptor(descriptor_id)
                    .name(Name(PREDEFINED_BASE_FONT))
                    .flags(FontFlags::SYMBOLIC)
                    .bbox(PdfRect::new(-25.0, -254.0, 1000.0, 880.0))
                    .italic_angle(0.0)
                    .ascent(880.0)
                    .descent(-120.0)
                    .cap_height(880.0)
                    .stem_v(80.0);
            }
            Self::Embedded(font) => {
                let program_id = alloc();
                let map_id = alloc();
                let name = Name(font.name.as_bytes());

                pdf.type0_font(font_id)
                    .base_font(name)
                    .encoding_predefined(Name(b"Identity-H"))
                    .descendant_font(cid_font_id)
                    .to_unicode(to_unicode_id);
                pdf.cid_font(cid_font_id)
                    .subtype(CidFontType::Type2)
                    .base_font(name)
                    .system_info(SystemInfo {
                        registry: Str(b"Adobe"),
                        ordering: Str(b"Identity"),
                        supplement: 0,
                    })
                    .font_descriptor(descriptor_id)
                    .default_width(1000.0)
                    .cid_to_gid_map_stream(map_id);
                let [left, bottom, right, top] = font.bbox;
                pdf.font_descriptor(descriptor_id)
                    .name(name)
                    .flags(FontFlags::SYMBOLIC)
                    .bbox(PdfRect::new(left, bottom, right, top))
                    .italic_angle(0.0)
                    .ascent(font.ascent)
                    .descent(font.descent)
                    .cap_height(font.cap_height)
                    .stem_v(80.0)
                    .font_file2(program_id);

                let mut program = pdf.stream(program_id, &font.program);
                program.filter(Filter::FlateDecode);
                program.pair(Name(b"Length1"), font.program_len as i32);
                program.finish();
                pdf.stream(map_id, &font.cid_to_gid).filter(Filter::FlateDecode);
            }
        }
    }
}

fn postscript_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('-'),
            _ => None,
        })
        .collect();
    if name.is_empty() {
        "CJKFont".to_string()
    } else {
        name
    }
}
