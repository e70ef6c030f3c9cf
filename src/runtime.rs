//! Cooperative event loop.
//!
//! One [`EventLoop::step`] does, in order:
//!
//! 1. pull inbound cloud messages into the queue (answering direct
//!    methods synchronously),
//! 2. ask the update agent for a pending update,
//! 3. let the scheduler post every due timer,
//! 4. drain the queue, running each handler to completion.
//!
//! Inbound pumping stops while the queue has no more than
//! [`RESERVED_SLOTS`] free, so due timers always find room.  Messages
//! left in the transport are picked up on the next step.

use log::{debug, warn};

use crate::app::commands::{AppCommand, DirectMethod};
use crate::app::ports::{
    ActuatorPort, CloudPort, EventSink, Inbound, MethodResponse, Ports, SchedulerDelegate,
    SensorPort, SystemPort,
};
use crate::app::service::{AppService, Flow};
use crate::config::SystemConfig;
use crate::error::Error;
use crate::events::{Event, EventQueue};
use crate::scheduler::{build_timer_table, Millis, Scheduler, TimerId};

/// Queue slots kept free for timer events and one update request.
pub const RESERVED_SLOTS: usize = TimerId::COUNT + 1;

/// Scheduler delegate that posts fired timers into the event queue.
struct QueueDelegate<'a> {
    queue: &'a mut EventQueue,
}

impl SchedulerDelegate for QueueDelegate<'_> {
    fn on_timer_fired(&mut self, id: TimerId) {
        if !self.queue.push(Event::Timer(id)) {
            warn!("Event queue full, timer '{}' dropped", id.name());
        }
    }
}

/// Owns the service, the scheduler, the queue and every adapter.
pub struct EventLoop<H, C, S, E> {
    app: AppService,
    scheduler: Scheduler,
    queue: EventQueue,
    io: Ports<H, C, S, E>,
}

impl<H, C, S, E> EventLoop<H, C, S, E>
where
    H: SensorPort + ActuatorPort,
    C: CloudPort,
    S: SystemPort,
    E: EventSink,
{
    /// Validate `config`, build the timer registry and start the service.
    pub fn new(
        config: SystemConfig,
        startup_utc: String,
        mut io: Ports<H, C, S, E>,
        now: Millis,
    ) -> Result<Self, Error> {
        config.validate()?;
        let mut scheduler = Scheduler::new(build_timer_table(&config));
        let mut app = AppService::new(config, startup_utc, now);
        app.start(now, &mut scheduler, &mut io.hw, &mut io.sink);

        Ok(Self {
            app,
            scheduler,
            queue: EventQueue::new(),
            io,
        })
    }

    /// Run one loop iteration at time `now`.
    pub fn step(&mut self, now: Millis) -> Flow {
        self.pump_inbound();

        if let Some(request) = self.io.system.poll_update_request() {
            self.enqueue(Event::Command(AppCommand::UpdateAvailable(request)));
        }

        let fired = self.scheduler.poll(
            now,
            &mut QueueDelegate {
                queue: &mut self.queue,
            },
        );
        if fired > 0 {
            debug!("Event loop: {fired} timer(s) due at {now}ms");
        }

        while let Some(event) = self.queue.pop() {
            let flow = match event {
                Event::Timer(id) => self.app.handle_timer(id, now, &mut self.scheduler, &mut self.io),
                Event::Command(cmd) => {
                    self.app
                        .handle_command(cmd, now, &mut self.scheduler, &mut self.io)
                }
            };
            if let Flow::Exit(_) = flow {
                return flow;
            }
        }
        Flow::Continue
    }

    /// Earliest pending timer deadline, for the idle wait between steps.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.scheduler.next_deadline()
    }

    pub fn app(&self) -> &AppService {
        &self.app
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn ports(&self) -> &Ports<H, C, S, E> {
        &self.io
    }

    pub fn ports_mut(&mut self) -> &mut Ports<H, C, S, E> {
        &mut self.io
    }

    // ── Internal ──────────────────────────────────────────────

    fn pump_inbound(&mut self) {
        while self.queue.free_slots() > RESERVED_SLOTS {
            let Some(message) = self.io.cloud.poll_inbound() else {
                break;
            };
            match message {
                Inbound::TwinWrite(write) => {
                    self.enqueue(Event::Command(AppCommand::TwinWrite(write)));
                }
                Inbound::MethodCall {
                    request_id, name, ..
                } => match DirectMethod::from_name(&name) {
                    Some(method) => {
                        let response = self.app.method_response(method);
                        self.io.cloud.respond_method(request_id, &response);
                        self.enqueue(Event::Command(AppCommand::DirectMethod(method)));
                    }
                    None => {
                        warn!("Direct method '{name}' not found");
                        self.io
                            .cloud
                            .respond_method(request_id, &MethodResponse::not_found(&name));
                    }
                },
            }
        }
    }

    fn enqueue(&mut self, event: Event) {
        if !self.queue.push(event) {
            warn!("Event queue full, inbound event dropped");
        }
    }
}
