use rocket::request::{self, FromRequest, Request, Outcome};

/// Value of the `X-Twilio-Signature` header, if any.
pub struct TwilioSignature(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TwilioSignature {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let signature = req
            .headers()
            .get_one("X-Twilio-Signature")
            .map(|s| s.to_string());
        Outcome::Success(TwilioSignature(signature))
    }
}
