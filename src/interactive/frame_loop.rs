//! Per-frame scheduling with a retained, cancellable handle

/// Platform hook that asks for one more frame at the next display refresh
pub trait FrameScheduler {
    fn request_frame(&self);
}

impl FrameScheduler for winit::window::Window {
    fn request_frame(&self) {
        self.request_redraw();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLoopState {
    Idle,
    Running,
    Cancelled,
}

/// Free-running frame loop.
///
/// The loop re-arms itself through a `FrameScheduler` after every frame.
/// Cancelling is terminal: no further frames are requested or admitted, so
/// a refresh that was already queued when the viewer was torn down does
/// nothing.
#[derive(Debug)]
pub struct FrameLoop {
    state: FrameLoopState,
    frames: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: FrameLoopState::Idle,
            frames: 0,
        }
    }

    pub fn start(&mut self) {
        if self.state == FrameLoopState::Idle {
            self.state = FrameLoopState::Running;
        }
    }

    pub fn state(&self) -> FrameLoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == FrameLoopState::Running
    }

    /// Frames admitted so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Ask for the next frame if the loop is still live
    pub fn schedule(&self, scheduler: &dyn FrameScheduler) -> bool {
        if self.is_running() {
            scheduler.request_frame();
        }
        self.is_running()
    }

    /// Admit one tick. Returns false once cancelled.
    pub fn begin_frame(&mut self) -> bool {
        if self.is_running() {
            self.frames += 1;
        }
        self.is_running()
    }

    pub fn cancel(&mut self) {
        self.state = FrameLoopState::Cancelled;
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}
