use std::io::{Read, Write as _};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::encode::sink::{FrameSink, OrderGuard, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{CapsyncError, CapsyncResult};
use crate::render::pipeline::RenderedFrame;

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

/// Sink that overlays PNG caption frames on a background video with the system `ffmpeg`.
///
/// Frames go to ffmpeg's stdin as an `image2pipe` stream; the background video is read from a
/// temporary file so its audio track can be copied unchanged. The muxed Matroska output is
/// collected from stdout and available through [`FfmpegCompositor::take_output`] after `end`.
pub struct FfmpegCompositor {
    background: Vec<u8>,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_drain: Option<Drain>,
    stderr_drain: Option<Drain>,
    background_tmp: TempFileGuard,

    order: OrderGuard,
    output: Option<Vec<u8>>,
}

impl FfmpegCompositor {
    /// Create a compositor over the raw `background` video bytes.
    pub fn new(background: Vec<u8>) -> Self {
        Self {
            background,
            child: None,
            stdin: None,
            stdout_drain: None,
            stderr_drain: None,
            background_tmp: TempFileGuard(None),
            order: OrderGuard::default(),
            output: None,
        }
    }

    /// Overlay `frames` (in order) on `background` and return the muxed video bytes.
    pub fn mux(
        background: Vec<u8>,
        cfg: SinkConfig,
        frames: &[RenderedFrame],
    ) -> CapsyncResult<Vec<u8>> {
        let mut compositor = Self::new(background);
        compositor.begin(cfg)?;
        for frame in frames {
            compositor.push_frame(frame.index, &frame.image)?;
        }
        compositor.end()?;
        compositor.take_output()
    }

    /// Muxed output of the last completed run.
    pub fn take_output(&mut self) -> CapsyncResult<Vec<u8>> {
        self.output
            .take()
            .ok_or_else(|| CapsyncError::composition("no muxed output; compositor has not finished"))
    }

    /// Close stdin, wait for ffmpeg and collect both output streams.
    fn finish_child(&mut self) -> CapsyncResult<(std::process::ExitStatus, Vec<u8>, Vec<u8>)> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| CapsyncError::composition("compositor not started"))?;
        let status = child
            .wait()
            .context("failed to wait for ffmpeg to finish")?;
        let stdout = join_drain(self.stdout_drain.take(), "stdout")?;
        let stderr = join_drain(self.stderr_drain.take(), "stderr")?;
        self.background_tmp.remove();
        Ok((status, stdout, stderr))
    }

    fn fail_from_child(&mut self, context: String) -> CapsyncError {
        match self.finish_child() {
            Ok((_, _, stderr)) if !stderr.is_empty() => {
                CapsyncError::composition(String::from_utf8_lossy(&stderr).trim().to_owned())
            }
            Ok(_) => CapsyncError::composition(context),
            Err(e) => e,
        }
    }
}

impl FrameSink for FfmpegCompositor {
    fn begin(&mut self, cfg: SinkConfig) -> CapsyncResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(CapsyncError::validation(
                "compositor frame width/height must be non-zero",
            ));
        }
        if !cfg.offset_y.is_finite() {
            return Err(CapsyncError::validation("compositor offset must be finite"));
        }
        if self.background.is_empty() {
            return Err(CapsyncError::validation("background video is empty"));
        }
        if !is_ffmpeg_on_path() {
            return Err(CapsyncError::composition(
                "ffmpeg is required for muxing, but was not found on PATH",
            ));
        }

        let bg_path = std::env::temp_dir().join(format!(
            "capsync_background_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        std::fs::write(&bg_path, &self.background).with_context(|| {
            format!("failed to write background video to '{}'", bg_path.display())
        })?;
        self.background_tmp = TempFileGuard(Some(bg_path.clone()));

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(["-y", "-loglevel", "error"]);
        cmd.args([
            "-f",
            "image2pipe",
            "-framerate",
            &cfg.fps.to_ffmpeg_rate(),
            "-video_size",
            &format!("{}x{}", cfg.width, cfg.height),
            "-i",
            "pipe:0",
            "-i",
        ])
        .arg(&bg_path)
        .args([
            "-filter_complex",
            &format!("[1:v][0:v]overlay=0:{}[out]", cfg.offset_y),
            "-map",
            "[out]",
            "-map",
            "1:a?",
            "-c:a",
            "copy",
            "-c:v",
            "libx264",
            "-preset",
            "ultrafast",
            "-pix_fmt",
            "yuv420p",
            "-f",
            "matroska",
            "pipe:1",
        ]);

        let mut child = cmd.spawn().map_err(|e| {
            CapsyncError::composition(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CapsyncError::composition("failed to open ffmpeg stdin (unexpected)"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CapsyncError::composition("failed to open ffmpeg stdout (unexpected)"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CapsyncError::composition("failed to open ffmpeg stderr (unexpected)"))?;

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            fps = %cfg.fps.to_ffmpeg_rate(),
            offset_y = cfg.offset_y,
            "spawned ffmpeg compositor"
        );

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_drain = Some(spawn_drain(stdout));
        self.stderr_drain = Some(spawn_drain(stderr));
        self.order.reset();
        self.output = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, image: &[u8]) -> CapsyncResult<()> {
        if self.child.is_none() {
            return Err(CapsyncError::composition("compositor not started"));
        }
        self.order.accept(idx)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CapsyncError::composition("compositor is already finalized"));
        };
        if let Err(e) = stdin.write_all(image) {
            return Err(self.fail_from_child(format!(
                "failed to write frame {} to ffmpeg stdin: {e}",
                idx.0
            )));
        }
        Ok(())
    }

    fn end(&mut self) -> CapsyncResult<()> {
        let frames = self.order.received();
        let (status, stdout, stderr) = self.finish_child()?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(CapsyncError::composition(stderr.trim().to_owned()));
        }
        tracing::debug!(frames, bytes = stdout.len(), "ffmpeg compositor finished");
        self.output = Some(stdout);
        Ok(())
    }
}

impl Drop for FfmpegCompositor {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn spawn_drain<R: Read + Send + 'static>(mut stream: R) -> Drain {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join_drain(handle: Option<Drain>, name: &str) -> CapsyncResult<Vec<u8>> {
    match handle {
        Some(handle) => {
            let bytes = handle
                .join()
                .map_err(|_| anyhow::anyhow!("ffmpeg {name} drain thread panicked"))?
                .with_context(|| format!("ffmpeg {name} read failed"))?;
            Ok(bytes)
        }
        None => Ok(Vec::new()),
    }
}

/// Width and height of the first video stream in `video`, read with `ffprobe`.
pub fn probe_video_size(video: &[u8]) -> CapsyncResult<(u32, u32)> {
    let mut child = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
            "-",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            CapsyncError::composition(format!(
                "failed to spawn ffprobe (is it installed and on PATH?): {e}"
            ))
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| CapsyncError::composition("failed to open ffprobe stdin (unexpected)"))?;
    let input = video.to_vec();
    // ffprobe may stop reading early; a broken pipe here is expected.
    let feeder = std::thread::spawn(move || {
        let _ = stdin.write_all(&input);
    });

    let output = child
        .wait_with_output()
        .context("failed to wait for ffprobe")?;
    let _ = feeder.join();

    if !output.status.success() {
        return Err(CapsyncError::composition(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ));
    }
    parse_probe_dimensions(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_dimensions(s: &str) -> CapsyncResult<(u32, u32)> {
    let line = s.lines().next().unwrap_or("").trim();
    let bad = || CapsyncError::composition(format!("unexpected ffprobe dimensions '{line}'"));
    let (w, h) = line.split_once('x').ok_or_else(bad)?;
    let w: u32 = w.trim().parse().map_err(|_| bad())?;
    let h: u32 = h.trim().trim_end_matches('x').parse().map_err(|_| bad())?;
    if w == 0 || h == 0 {
        return Err(bad());
    }
    Ok((w, h))
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    fn remove(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
