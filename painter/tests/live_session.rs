use std::sync::Arc;
use std::time::Duration;

use common::chunk::{to_absolute, CHUNK_AREA};
use common::protocol::decode_binary;
use common::{Canvas, ChunkRect, Palette, Rgb, ServerEvent, Target};
use futures::{SinkExt, StreamExt};
use painter::notify::{resume_channel, Notifier, Operator};
use painter::{connection, dispatcher, seed, Pacing, PainterError, Placer, Session, Strategy};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const OK_RESULT: [u8; 8] = [0xC3, 0, 0, 0, 0, 0, 0, 0];

struct Silent;

impl Notifier for Silent {
    fn notify(&self, _message: &str) {}
}

fn canvas() -> Canvas {
    let palette = Palette::new(vec![
        Rgb::new(202, 227, 255),
        Rgb::new(255, 255, 255),
        Rgb::new(255, 255, 255),
        Rgb::new(0, 0, 0),
        Rgb::new(255, 0, 0),
    ])
    .unwrap();
    Canvas::new(0, 4096, palette).unwrap()
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, url)
}

fn binary(message: Message) -> Vec<u8> {
    match message {
        Message::Binary(data) => data.to_vec(),
        other => panic!("expected a binary frame, got {other:?}"),
    }
}

/// Read frames until the first placement, which is returned separately.
async fn read_setup<S>(ws: &mut S) -> (Vec<Vec<u8>>, Vec<u8>)
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut setup = Vec::new();
    loop {
        let frame = binary(ws.next().await.unwrap().unwrap());
        if frame[0] == 0xC1 {
            return (setup, frame);
        }
        setup.push(frame);
    }
}

struct Client {
    placer: Placer,
    receiver: tokio::task::JoinHandle<Result<(), PainterError>>,
    _resume: watch::Sender<u64>,
}

/// Paint `target` at `origin`, wired up the way the binary does it.
async fn start_client(
    url: &str,
    origin: (i64, i64),
    target: Target,
    seeded: Vec<(u8, u8, Vec<u8>)>,
) -> Client {
    let canvas = canvas();
    let rect = ChunkRect::covering(&canvas, origin.0, origin.1, target.width(), target.height()).unwrap();
    let cache = seed::fill(&canvas, rect, seeded);
    let session = Session::new(canvas, cache);

    let (mut sink, frames) = connection::connect(url, "http://127.0.0.1", None, None).await.unwrap();
    connection::announce(&mut sink, 0, &rect).await.unwrap();
    let (outbound, _writer) = connection::spawn_writer(sink);
    let receiver = tokio::spawn(dispatcher::run(frames, session.clone()));

    let (resume_tx, resume_rx) = resume_channel();
    let placer = Placer::new(
        session,
        outbound,
        Arc::new(target),
        origin,
        Operator::new(Arc::new(Silent), resume_rx),
        Pacing::none(),
    );
    Client {
        placer,
        receiver,
        _resume: resume_tx,
    }
}

#[tokio::test]
async fn paints_one_pixel_at_a_time_over_a_real_socket() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Noise the client must tolerate.
        ws.send(Message::Binary(vec![0xA7, 0, 42].into())).await.unwrap();
        ws.send(Message::Binary(vec![0x7F, 1].into())).await.unwrap();
        ws.send(Message::Binary(vec![0xC3, 0].into())).await.unwrap();
        ws.send(Message::Text(r#"["bob","hi",0]"#.to_string().into())).await.unwrap();

        let (setup, mut next) = read_setup(&mut ws).await;
        let mut placed = Vec::new();
        loop {
            let frame = next;
            // No second placement may arrive before this one is answered.
            assert!(
                timeout(Duration::from_millis(30), ws.next()).await.is_err(),
                "client sent a second placement while one was in flight"
            );
            // Broadcast the change, then answer.
            ws.send(Message::Binary(frame.clone().into())).await.unwrap();
            ws.send(Message::Binary(OK_RESULT.to_vec().into())).await.unwrap();
            placed.push(frame);
            next = match timeout(Duration::from_millis(500), ws.next()).await {
                Ok(Some(Ok(message))) => binary(message),
                _ => break,
            };
        }
        (setup, placed)
    });

    let canvas = canvas();
    // At (254, -1) a 4x2 image spans chunks x 8..9, y 7..8. Skip pixels and
    // the already-correct pixel need no placement.
    let target = Target::new(
        4,
        2,
        vec![3, 255, 4, 2, 255, 255, 255, 255],
        canvas.palette(),
    )
    .unwrap();
    // Absolute (257, -1) sits in chunk (9, 7) at local (1, 255). It holds
    // reserved index 1, whose value equals index 2.
    let mut chunk = vec![0u8; CHUNK_AREA];
    chunk[255 * 256 + 1] = 1;
    let mut client = start_client(&url, (254, -1), target, vec![(9, 7, chunk)]).await;

    timeout(Duration::from_secs(5), client.placer.run_pass(Strategy::Forward))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.placer.stats().placed, 2);

    let (setup, placed) = server.await.unwrap();
    assert_eq!(setup[0], vec![0xA0, 0]);
    let chunks: Vec<_> = setup[1..].iter().map(|f| (f[0], f[1], f[2])).collect();
    assert_eq!(
        chunks,
        vec![(0xA1, 8, 7), (0xA1, 9, 7), (0xA1, 8, 8), (0xA1, 9, 8)]
    );

    let canvas = self::canvas();
    let coords: Vec<_> = placed
        .iter()
        .map(|frame| match decode_binary(frame).unwrap() {
            ServerEvent::PixelUpdate(p) => (to_absolute(&canvas, p.pos), p.color),
            other => panic!("unexpected frame {other:?}"),
        })
        .collect();
    assert_eq!(coords, vec![((254, -1), 3), ((256, -1), 4)]);

    client.receiver.abort();
}

#[tokio::test]
async fn server_hangup_stops_the_driver() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Take the first placement, then hang up without answering.
        let (_, placement) = read_setup(&mut ws).await;
        ws.close(None).await.unwrap();
        placement
    });

    let canvas = canvas();
    let target = Target::new(2, 1, vec![3, 3], canvas.palette()).unwrap();
    let mut client = start_client(&url, (250, -3), target, Vec::new()).await;

    let result = timeout(Duration::from_secs(5), client.placer.run_pass(Strategy::Forward))
        .await
        .unwrap();
    assert!(matches!(result, Err(PainterError::ConnectionClosed)));

    let receiver = client.receiver.await.unwrap();
    assert!(receiver.is_err());
    assert_eq!(server.await.unwrap()[0], 0xC1);
}
