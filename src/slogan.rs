//! Club slogan card: slogan text over up to three officer portraits.
//!
//! Rendered cards are written to `<cache_dir>/slogan_<club_no>.png`. The cache
//! is never invalidated here; the browser route re-renders on every request and
//! the mobile route prefers the cached file.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::images::encode_png;
use crate::models::club::Club;
use crate::models::member::Member;
use crate::models::photo::{PhotoKind, StoredPhoto};
use crate::models::staff::ClubStaff;

pub const CANVAS_WIDTH: u32 = 900;
pub const CANVAS_HEIGHT: u32 = 600;
pub const TILE_WIDTH: u32 = 240;
pub const TILE_HEIGHT: u32 = 320;
pub const MAX_TILES: usize = 3;

const TILE_TOP: u32 = 120;
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const NAVY: Rgba<u8> = Rgba([0, 48, 135, 255]);
const GOLD: Rgba<u8> = Rgba([235, 179, 40, 255]);
const PLACEHOLDER: Rgba<u8> = Rgba([210, 210, 210, 255]);

/// One portrait slot on the card.
#[derive(Debug, Clone)]
pub struct Tile {
    pub name: String,
    pub photo: Option<Vec<u8>>,
}

pub fn cache_path(cache_dir: &str, club_no: i64) -> PathBuf {
    Path::new(cache_dir).join(format!("slogan_{}.png", club_no))
}

pub fn load_font(path: &str) -> Option<FontVec> {
    let data = match fs::read(path) {
        Ok(d) => d,
        Err(e) => {
            log::warn!("slogan font {} unavailable: {}", path, e);
            return None;
        }
    };
    match FontVec::try_from_vec(data) {
        Ok(f) => Some(f),
        Err(e) => {
            log::warn!("slogan font {} unreadable: {}", path, e);
            None
        }
    }
}

/// Officers first (president, secretary, treasurer), then the highest-ranked
/// remaining members, up to [`MAX_TILES`].
pub fn collect_tiles(pool: &DbPool, club_no: i64) -> Result<Vec<Tile>, String> {
    let mut picked: Vec<Member> = Vec::new();

    if let Some(staff) = ClubStaff::current(pool, club_no) {
        for name in staff.officer_names() {
            if let Some(m) = Member::find_in_club_by_name(pool, club_no, name) {
                if !picked.iter().any(|p| p.member_no == m.member_no) {
                    picked.push(m);
                }
            }
        }
    }

    if picked.len() < MAX_TILES {
        for m in Member::list_by_club(pool, club_no)? {
            if picked.len() >= MAX_TILES {
                break;
            }
            if !picked.iter().any(|p| p.member_no == m.member_no) {
                picked.push(m);
            }
        }
    }

    Ok(picked
        .into_iter()
        .take(MAX_TILES)
        .map(|m| Tile {
            photo: StoredPhoto::latest(pool, PhotoKind::Portrait, m.member_no).map(|p| p.bytes),
            name: m.member_name,
        })
        .collect())
}

/// Left edge of each tile so the row is evenly spaced across the canvas.
pub fn tile_positions(count: usize) -> Vec<u32> {
    let count = count.min(MAX_TILES) as u32;
    if count == 0 {
        return vec![];
    }
    let gap = (CANVAS_WIDTH - count * TILE_WIDTH) / (count + 1);
    (0..count).map(|i| gap + i * (TILE_WIDTH + gap)).collect()
}

fn tile_image(tile: &Tile) -> RgbaImage {
    let decoded = tile
        .photo
        .as_deref()
        .and_then(|bytes| image::load_from_memory(bytes).ok());
    match decoded {
        Some(img) => img
            .resize_to_fill(TILE_WIDTH, TILE_HEIGHT, FilterType::Lanczos3)
            .to_rgba8(),
        None => RgbaImage::from_pixel(TILE_WIDTH, TILE_HEIGHT, PLACEHOLDER),
    }
}

fn draw_centered(canvas: &mut RgbaImage, font: &FontVec, text: &str, size: f32, center_x: u32, y: u32, color: Rgba<u8>) {
    if text.is_empty() {
        return;
    }
    let scale = PxScale::from(size);
    let (w, _) = text_size(scale, font, text);
    let x = center_x as i32 - (w as i32 / 2);
    draw_text_mut(canvas, color, x.max(0), y as i32, scale, font, text);
}

/// Compose the card as PNG bytes. Text is skipped when no font is available.
pub fn render(club: &Club, tiles: &[Tile], font: Option<&FontVec>) -> Result<Vec<u8>, String> {
    let mut canvas = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, WHITE);

    // Header and footer bands
    draw_filled_rect_mut(&mut canvas, Rect::at(0, 0).of_size(CANVAS_WIDTH, 96), NAVY);
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(0, (CANVAS_HEIGHT - 56) as i32).of_size(CANVAS_WIDTH, 56),
        NAVY,
    );

    let positions = tile_positions(tiles.len());
    for (tile, x) in tiles.iter().zip(positions.iter()) {
        let img = tile_image(tile);
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(*x as i32 - 3, TILE_TOP as i32 - 3).of_size(TILE_WIDTH + 6, TILE_HEIGHT + 6),
            GOLD,
        );
        imageops::overlay(&mut canvas, &img, *x as i64, TILE_TOP as i64);
    }

    if let Some(font) = font {
        let center = CANVAS_WIDTH / 2;
        draw_centered(&mut canvas, font, &club.slogan, 40.0, center, 26, WHITE);
        for (tile, x) in tiles.iter().zip(positions.iter()) {
            draw_centered(
                &mut canvas,
                font,
                &tile.name,
                26.0,
                x + TILE_WIDTH / 2,
                TILE_TOP + TILE_HEIGHT + 14,
                NAVY,
            );
        }
        draw_centered(&mut canvas, font, &club.club_name, 28.0, center, CANVAS_HEIGHT - 44, GOLD);
    }

    encode_png(&DynamicImage::ImageRgba8(canvas))
}

/// Render the card for a club and overwrite its cache file.
pub fn render_and_cache(pool: &DbPool, config: &AppConfig, club_no: i64) -> Result<Vec<u8>, String> {
    let club = Club::find(pool, club_no).ok_or_else(|| format!("club {} not found", club_no))?;
    let tiles = collect_tiles(pool, club_no)?;
    let font = load_font(&config.font_path);
    let png = render(&club, &tiles, font.as_ref())?;

    fs::create_dir_all(&config.cache_dir).map_err(|e| e.to_string())?;
    let path = cache_path(&config.cache_dir, club_no);
    fs::write(&path, &png).map_err(|e| e.to_string())?;
    log::info!("rendered slogan card for club {} -> {}", club_no, path.display());

    Ok(png)
}

/// Cached card if one was rendered before.
pub fn cached(config: &AppConfig, club_no: i64) -> Option<Vec<u8>> {
    fs::read(cache_path(&config.cache_dir, club_no)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn club() -> Club {
        Club {
            club_no: 1,
            club_name: "Seoul Central".to_string(),
            region_no: None,
            region_name: None,
            charter_date: String::new(),
            phone: String::new(),
            address: String::new(),
            slogan: "We Serve".to_string(),
        }
    }

    #[test]
    fn tiles_are_spaced_evenly() {
        assert!(tile_positions(0).is_empty());
        assert_eq!(tile_positions(1), vec![330]);
        let three = tile_positions(3);
        assert_eq!(three, vec![45, 330, 615]);
        // Never more than three slots
        assert_eq!(tile_positions(5).len(), MAX_TILES);
    }

    #[test]
    fn renders_without_font() {
        let tiles = vec![
            Tile {
                name: "Kim".to_string(),
                photo: Some(crate::images::tests::noise_png(80, 60)),
            },
            Tile {
                name: "Lee".to_string(),
                photo: None,
            },
        ];
        let png = render(&club(), &tiles, None).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));

        // Second tile falls back to the placeholder fill
        let x = tile_positions(2)[1] + TILE_WIDTH / 2;
        let px = img.get_pixel(x, TILE_TOP + TILE_HEIGHT / 2);
        assert_eq!(px, PLACEHOLDER);
    }

    #[test]
    fn missing_font_is_skipped() {
        assert!(load_font("/nonexistent/font.ttf").is_none());
    }

    #[test]
    fn cache_is_per_club() {
        assert_eq!(
            cache_path("cache", 12),
            Path::new("cache").join("slogan_12.png")
        );
    }
}
