/// Drawing and measuring seams.
pub mod canvas;
/// CPU canvas on `vello_cpu` and `parley`.
pub mod cpu;
/// Sequential and parallel frame rendering.
pub mod pipeline;
/// Pure per-frame scene composition.
pub mod scene;
