use crate::util::FiniteF32;

#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
)]
#[repr(u8)]
pub enum LayerMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
    Overlay,
    Difference,
}

/// How a layer combines with what lies below it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Blend {
    pub mode: LayerMode,
    pub opacity: FiniteF32,
}
impl Default for Blend {
    fn default() -> Self {
        Self {
            mode: LayerMode::default(),
            opacity: FiniteF32::ONE,
        }
    }
}
