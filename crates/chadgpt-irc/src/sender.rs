/// Outbound protocol actions.
///
/// Every method is fire-and-forget: the command is queued for the connection
/// and no delivery confirmation is awaited.
pub trait IrcSender: Send + Sync {
    fn join(&self, channel: &str);

    /// Send text to a channel or nick.
    ///
    /// Implementations may split text longer than one protocol line into
    /// several messages. Continuation chunks carry no `"<sender>: "` prefix
    /// and do not count toward the reply line cap.
    fn say(&self, target: &str, text: &str);

    fn change_nick(&self, nick: &str);

    fn quit(&self, reason: Option<&str>);
}
