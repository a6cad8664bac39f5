use std::sync::Arc;

use super::{UndoDelta, UndoError, UndoMode, UndoType};
use crate::state::{BaseType, Grid, Image, Metadata, Parasite, Precision};
use crate::units::Resolution;

#[derive(Clone, Debug)]
enum ImageState {
    Type(BaseType),
    Precision(Precision),
    Size { width: u32, height: u32 },
    Resolution(Resolution),
    Grid(Option<Grid>),
    Colormap(Option<Vec<[u8; 3]>>),
    HiddenProfile(Option<Arc<[u8]>>),
    Metadata(Option<Metadata>),
    Parasite {
        name: String,
        parasite: Option<Parasite>,
    },
}

/// A change to an image-wide property.
#[derive(Clone, Debug)]
pub struct ImageUndo {
    ty: UndoType,
    state: ImageState,
}
impl ImageUndo {
    #[must_use]
    pub fn image_type(image: &Image) -> Self {
        Self {
            ty: UndoType::ImageType,
            state: ImageState::Type(image.base_type),
        }
    }
    #[must_use]
    pub fn precision(image: &Image) -> Self {
        Self {
            ty: UndoType::ImagePrecision,
            state: ImageState::Precision(image.precision),
        }
    }
    #[must_use]
    pub fn size(image: &Image) -> Self {
        Self {
            ty: UndoType::ImageSize,
            state: ImageState::Size {
                width: image.width,
                height: image.height,
            },
        }
    }
    #[must_use]
    pub fn resolution(image: &Image) -> Self {
        Self {
            ty: UndoType::ImageResolution,
            state: ImageState::Resolution(image.resolution),
        }
    }
    #[must_use]
    pub fn grid(image: &Image) -> Self {
        Self {
            ty: UndoType::ImageGrid,
            state: ImageState::Grid(image.grid),
        }
    }
    #[must_use]
    pub fn colormap(image: &Image) -> Self {
        Self {
            ty: UndoType::ImageColormap,
            state: ImageState::Colormap(image.colormap.clone()),
        }
    }
    #[must_use]
    pub fn hidden_profile(image: &Image) -> Self {
        Self {
            ty: UndoType::ImageHiddenProfile,
            state: ImageState::HiddenProfile(image.hidden_profile.clone()),
        }
    }
    #[must_use]
    pub fn metadata(image: &Image) -> Self {
        Self {
            ty: UndoType::ImageMetadata,
            state: ImageState::Metadata(image.metadata.clone()),
        }
    }
    /// Before attaching a parasite named `name`, replacing any already there.
    #[must_use]
    pub fn parasite_attach(image: &Image, name: &str) -> Self {
        Self::parasite(UndoType::ParasiteAttach, image, name)
    }
    #[must_use]
    pub fn parasite_remove(image: &Image, name: &str) -> Self {
        Self::parasite(UndoType::ParasiteRemove, image, name)
    }
    fn parasite(ty: UndoType, image: &Image, name: &str) -> Self {
        Self {
            ty,
            state: ImageState::Parasite {
                name: name.to_owned(),
                parasite: image.parasites.get(name).cloned(),
            },
        }
    }
}
impl UndoDelta for ImageUndo {
    fn undo_type(&self) -> UndoType {
        self.ty
    }
    fn apply(&mut self, image: &mut Image, _: UndoMode) -> Result<(), UndoError> {
        match &mut self.state {
            ImageState::Type(base_type) => std::mem::swap(base_type, &mut image.base_type),
            ImageState::Precision(precision) => std::mem::swap(precision, &mut image.precision),
            ImageState::Size { width, height } => {
                std::mem::swap(width, &mut image.width);
                std::mem::swap(height, &mut image.height);
            }
            ImageState::Resolution(resolution) => {
                std::mem::swap(resolution, &mut image.resolution);
            }
            ImageState::Grid(grid) => std::mem::swap(grid, &mut image.grid),
            ImageState::Colormap(colormap) => std::mem::swap(colormap, &mut image.colormap),
            ImageState::HiddenProfile(profile) => {
                std::mem::swap(profile, &mut image.hidden_profile);
            }
            ImageState::Metadata(metadata) => std::mem::swap(metadata, &mut image.metadata),
            ImageState::Parasite { name, parasite } => {
                *parasite = image.parasites.replace(name, parasite.take());
            }
        }
        Ok(())
    }
    fn memory_size(&self) -> usize {
        let heap = match &self.state {
            ImageState::Colormap(Some(colormap)) => colormap.capacity() * 3,
            ImageState::HiddenProfile(Some(profile)) => profile.len(),
            ImageState::Metadata(Some(metadata)) => metadata.heap_size(),
            ImageState::Parasite { name, parasite } => {
                name.capacity() + parasite.as_ref().map_or(0, Parasite::heap_size)
            }
            _ => 0,
        };
        std::mem::size_of::<Self>() + heap
    }
}
